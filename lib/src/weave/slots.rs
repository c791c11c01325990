use super::Error;
use crate::bytecode::model::MethodBody;
use crate::bytecode::ValueKind;
use crate::util::Width;

/// Hands out fresh local slots above everything a method already uses
///
/// Slots are never reused: each allocation grows the method's locals.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    next_slot: usize,
}

impl SlotAllocator {
    pub fn for_method(method: &MethodBody) -> SlotAllocator {
        SlotAllocator {
            next_slot: method.locals_in_use(),
        }
    }

    /// Reserve a slot (two for `long` and `double`)
    pub fn allocate(&mut self, kind: ValueKind) -> Result<u16, Error> {
        let slot = self.next_slot;
        let end = slot + kind.width();
        if end > u16::MAX as usize {
            return Err(Error::LocalsOverflow);
        }
        self.next_slot = end;
        Ok(slot as u16)
    }

    /// Number of locals the method needs once these slots are in use
    pub fn max_locals(&self) -> u16 {
        self.next_slot as u16
    }

    /// Grow the method's locals to cover the allocated slots
    pub fn commit(&self, method: &mut MethodBody) {
        method.max_locals = method.max_locals.max(self.max_locals());
    }
}
