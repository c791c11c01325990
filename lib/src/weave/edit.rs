use super::{Error, SlotAllocator};
use crate::bytecode::code::{sequence_peak, InsnRef, Instruction};
use crate::bytecode::model::MethodBody;
use crate::bytecode;

/// One change to a method body, anchored on an instruction that exists before any edits
#[derive(Debug, Clone)]
pub enum Edit {
    InsertBefore(InsnRef, Vec<Instruction>),
    InsertAfter(InsnRef, Vec<Instruction>),
    Replace(InsnRef, Vec<Instruction>),

    /// Swap the whole body, along with the bounds that go with it
    ReplaceBody {
        instructions: Vec<Instruction>,
        max_stack: u16,
        max_locals: u16,
    },
}

impl Edit {
    fn anchor(&self) -> Option<InsnRef> {
        match self {
            Edit::InsertBefore(anchor, _) | Edit::InsertAfter(anchor, _) | Edit::Replace(anchor, _) => {
                Some(*anchor)
            }
            Edit::ReplaceBody { .. } => None,
        }
    }

    fn sequence(&self) -> &[Instruction] {
        match self {
            Edit::InsertBefore(_, code) | Edit::InsertAfter(_, code) | Edit::Replace(_, code) => code,
            Edit::ReplaceBody { instructions, .. } => instructions,
        }
    }
}

/// Everything one directive will do to one method
///
/// Plans are built without touching the method, so a directive that fails while planning
/// leaves nothing behind.
#[derive(Debug)]
pub struct Plan {
    pub edits: Vec<Edit>,
    pub slots: SlotAllocator,
}

impl Plan {
    pub fn new(method: &MethodBody) -> Plan {
        Plan {
            edits: vec![],
            slots: SlotAllocator::for_method(method),
        }
    }

    /// Number of injection points the plan touches
    pub fn points(&self) -> usize {
        self.edits.len()
    }

    /// Apply the plan
    ///
    /// Every anchor is checked before the first edit is made. `max_stack` grows by the peak of
    /// the largest inserted sequence, which is an upper bound (a later stack simulation can
    /// tighten it).
    pub fn apply(self, method: &mut MethodBody) -> Result<usize, Error> {
        for anchor in self.edits.iter().filter_map(Edit::anchor) {
            if !method.instructions.contains(anchor) {
                method.instructions.get(anchor)?;
            }
        }

        let points = self.points();
        let peak = self
            .edits
            .iter()
            .map(|edit| sequence_peak(edit.sequence()))
            .max()
            .unwrap_or(0);
        let mut replaced_body = false;

        for edit in self.edits {
            match edit {
                Edit::InsertBefore(anchor, code) => {
                    method.instructions.insert_before(anchor, code)?;
                }
                Edit::InsertAfter(anchor, code) => {
                    method.instructions.insert_after(anchor, code)?;
                }
                Edit::Replace(anchor, code) => {
                    method.instructions.replace(anchor, code)?;
                }
                Edit::ReplaceBody {
                    instructions,
                    max_stack,
                    max_locals,
                } => {
                    method.instructions = instructions.into_iter().collect();
                    method.max_stack = max_stack;
                    method.max_locals = max_locals;
                    replaced_body = true;
                }
            }
        }

        if !replaced_body {
            let max_stack = method.max_stack as usize + peak;
            method.max_stack = u16::try_from(max_stack)
                .map_err(|_| bytecode::Error::MaxStackOverflow(max_stack))?;
            self.slots.commit(method);
        }
        Ok(points)
    }
}
