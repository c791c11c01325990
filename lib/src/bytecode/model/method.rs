use crate::bytecode::code::{
    compute_max_locals, compute_max_stack, Instruction, InstructionStream, LabelId,
};
use crate::bytecode::{
    Error, MethodAccessFlags, RenderDescriptor, Signature, UnqualifiedName, ValueKind, ValueType,
};
use crate::util::{Offset, OffsetVec, Width};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Method with its code
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodBody {
    pub name: UnqualifiedName,
    pub descriptor: Signature,
    #[serde(default)]
    pub access_flags: MethodAccessFlags,

    /// Upper bound on the operand stack depth, in slots
    #[serde(default)]
    pub max_stack: u16,

    /// Number of local slots, parameters (and `this`) included
    #[serde(default)]
    pub max_locals: u16,

    pub instructions: InstructionStream,
}

impl MethodBody {
    /// Create a method, computing its stack and locals bounds from the code
    pub fn new(
        name: UnqualifiedName,
        descriptor: Signature,
        access_flags: MethodAccessFlags,
        instructions: InstructionStream,
    ) -> Result<MethodBody, Error> {
        let mut method = MethodBody {
            name,
            descriptor,
            access_flags,
            max_stack: 0,
            max_locals: 0,
            instructions,
        };
        method.recompute_bounds()?;
        Ok(method)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Is this a constructor?
    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    /// `name` followed by the descriptor (eg. `compute(II)I`)
    pub fn identity(&self) -> String {
        format!("{}{}", self.name, self.descriptor.render())
    }

    /// Slots taken up by the parameters on entry, `this` included
    pub fn parameter_length(&self) -> usize {
        self.descriptor.parameter_length(!self.is_static())
    }

    /// Kinds of the locals holding the parameters on entry, `this` included
    pub fn parameter_layout(&self) -> OffsetVec<ValueKind> {
        let mut layout = OffsetVec::new();
        if !self.is_static() {
            layout.push(ValueKind::Reference);
        }
        for parameter in &self.descriptor.parameters {
            layout.push(parameter.value_kind());
        }
        layout
    }

    /// Local slot and type of a declared parameter (zero-based, not counting `this`)
    pub fn argument_slot(&self, index: usize) -> Option<(u16, &ValueType)> {
        let parameter = self.descriptor.parameters.get(index)?;
        let skip = if self.is_static() { 0 } else { 1 };
        let Offset(offset) = self.parameter_layout().get_index(index + skip)?.0;
        Some((offset as u16, parameter))
    }

    /// Number of local slots the code actually needs, which can exceed an understated `max_locals`
    pub fn locals_in_use(&self) -> usize {
        (self.max_locals as usize).max(compute_max_locals(&self.instructions, self.parameter_length()))
    }

    /// A label id greater than every label used in the body
    pub fn next_free_label(&self) -> LabelId {
        self.instructions
            .instructions()
            .filter_map(|instruction| match instruction {
                Instruction::Label(label) => Some(*label),
                Instruction::Branch(_, label) => Some(*label),
                _ => None,
            })
            .max()
            .map_or(LabelId(0), |label| label.next())
    }

    /// Recompute `max_stack` and `max_locals` from scratch by simulating the code
    pub fn recompute_bounds(&mut self) -> Result<(), Error> {
        let max_stack = compute_max_stack(&self.instructions)?;
        let max_locals = compute_max_locals(&self.instructions, self.parameter_length());
        self.max_stack = u16::try_from(max_stack).map_err(|_| Error::MaxStackOverflow(max_stack))?;
        self.max_locals =
            u16::try_from(max_locals).map_err(|_| Error::MaxLocalsOverflow(max_locals))?;
        Ok(())
    }

    /// Human readable listing of the method
    pub fn listing(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} // max_stack = {}, max_locals = {}",
            self.identity(),
            self.max_stack,
            self.max_locals
        );
        for instruction in self.instructions.instructions() {
            let _ = match instruction {
                Instruction::Label(_) => writeln!(out, "  {}", instruction),
                _ => writeln!(out, "    {}", instruction),
            };
        }
        out
    }

    /// Width of the value the method returns
    pub fn return_width(&self) -> usize {
        self.descriptor.return_type.as_ref().map_or(0, |typ| typ.width())
    }
}
