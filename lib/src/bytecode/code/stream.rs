use super::Instruction;
use crate::bytecode::Error;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_STREAM_ID: AtomicU32 = AtomicU32::new(0);

fn fresh_stream_id() -> u32 {
    NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stable handle to one instruction in an [`InstructionStream`]
///
/// Inserting or removing other instructions never changes what an anchor refers to. Using an
/// anchor on a stream that did not hand it out (including a clone of that stream) is an error.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct InsnRef {
    stream: u32,
    index: u32,
}

#[derive(Clone)]
struct Node {
    instruction: Instruction,
    prev: Option<u32>,
    next: Option<u32>,
    live: bool,
}

/// Mutable method body as a doubly linked list of instructions
///
/// Nodes live in an arena and are never moved, so every edit is O(1) relative to its anchor.
/// Removed nodes stay in the arena (marked dead) so that stale anchors can be detected.
pub struct InstructionStream {
    id: u32,
    nodes: Vec<Node>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl InstructionStream {
    pub fn new() -> InstructionStream {
        InstructionStream {
            id: fresh_stream_id(),
            nodes: vec![],
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of live instructions
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn anchor(&self, index: u32) -> InsnRef {
        InsnRef {
            stream: self.id,
            index,
        }
    }

    /// Check that an anchor belongs to this stream and is still live
    fn check(&self, anchor: InsnRef) -> Result<u32, Error> {
        if anchor.stream != self.id {
            return Err(Error::ForeignAnchor(anchor));
        }
        match self.nodes.get(anchor.index as usize) {
            Some(node) if node.live => Ok(anchor.index),
            Some(_) => Err(Error::RemovedAnchor(anchor)),
            None => Err(Error::ForeignAnchor(anchor)),
        }
    }

    /// Is this anchor a live instruction of this stream?
    pub fn contains(&self, anchor: InsnRef) -> bool {
        self.check(anchor).is_ok()
    }

    fn allocate(&mut self, instruction: Instruction) -> u32 {
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            instruction,
            prev: None,
            next: None,
            live: true,
        });
        self.len += 1;
        index
    }

    /// Link a fresh node in between `prev` and `next`
    fn link(&mut self, index: u32, prev: Option<u32>, next: Option<u32>) {
        self.nodes[index as usize].prev = prev;
        self.nodes[index as usize].next = next;
        match prev {
            Some(prev) => self.nodes[prev as usize].next = Some(index),
            None => self.head = Some(index),
        }
        match next {
            Some(next) => self.nodes[next as usize].prev = Some(index),
            None => self.tail = Some(index),
        }
    }

    /// Append an instruction to the end of the stream
    pub fn push_back(&mut self, instruction: Instruction) -> InsnRef {
        let index = self.allocate(instruction);
        let tail = self.tail;
        self.link(index, tail, None);
        self.anchor(index)
    }

    /// Prepend an instruction to the start of the stream
    pub fn push_front(&mut self, instruction: Instruction) -> InsnRef {
        let index = self.allocate(instruction);
        let head = self.head;
        self.link(index, None, head);
        self.anchor(index)
    }

    pub fn first(&self) -> Option<InsnRef> {
        self.head.map(|index| self.anchor(index))
    }

    pub fn last(&self) -> Option<InsnRef> {
        self.tail.map(|index| self.anchor(index))
    }

    pub fn next(&self, anchor: InsnRef) -> Result<Option<InsnRef>, Error> {
        let index = self.check(anchor)?;
        Ok(self.nodes[index as usize].next.map(|i| self.anchor(i)))
    }

    pub fn prev(&self, anchor: InsnRef) -> Result<Option<InsnRef>, Error> {
        let index = self.check(anchor)?;
        Ok(self.nodes[index as usize].prev.map(|i| self.anchor(i)))
    }

    pub fn get(&self, anchor: InsnRef) -> Result<&Instruction, Error> {
        let index = self.check(anchor)?;
        Ok(&self.nodes[index as usize].instruction)
    }

    /// Insert a sequence right before the anchor, returning anchors to the new instructions
    pub fn insert_before(
        &mut self,
        anchor: InsnRef,
        sequence: impl IntoIterator<Item = Instruction>,
    ) -> Result<Vec<InsnRef>, Error> {
        let index = self.check(anchor)?;
        let mut inserted = vec![];
        for instruction in sequence {
            let prev = self.nodes[index as usize].prev;
            let new_index = self.allocate(instruction);
            self.link(new_index, prev, Some(index));
            inserted.push(self.anchor(new_index));
        }
        Ok(inserted)
    }

    /// Insert a sequence right after the anchor, returning anchors to the new instructions
    pub fn insert_after(
        &mut self,
        anchor: InsnRef,
        sequence: impl IntoIterator<Item = Instruction>,
    ) -> Result<Vec<InsnRef>, Error> {
        let mut after = self.check(anchor)?;
        let mut inserted = vec![];
        for instruction in sequence {
            let next = self.nodes[after as usize].next;
            let new_index = self.allocate(instruction);
            self.link(new_index, Some(after), next);
            inserted.push(self.anchor(new_index));
            after = new_index;
        }
        Ok(inserted)
    }

    /// Remove the anchored instruction, returning it
    pub fn remove(&mut self, anchor: InsnRef) -> Result<Instruction, Error> {
        let index = self.check(anchor)?;
        let Node { prev, next, .. } = self.nodes[index as usize];
        match prev {
            Some(prev) => self.nodes[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next as usize].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[index as usize];
        node.live = false;
        node.prev = None;
        node.next = None;
        self.len -= 1;
        Ok(std::mem::replace(&mut node.instruction, Instruction::Dup))
    }

    /// Replace the anchored instruction with a sequence (which may be empty)
    pub fn replace(
        &mut self,
        anchor: InsnRef,
        sequence: impl IntoIterator<Item = Instruction>,
    ) -> Result<(Instruction, Vec<InsnRef>), Error> {
        let inserted = self.insert_before(anchor, sequence)?;
        let removed = self.remove(anchor)?;
        Ok((removed, inserted))
    }

    /// Drop every instruction
    pub fn clear(&mut self) {
        for node in &mut self.nodes {
            node.live = false;
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Instructions in program order, with their anchors
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stream: self,
            cursor: self.head,
        }
    }

    /// Instructions in program order
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.iter().map(|(_, instruction)| instruction)
    }

    /// Anchors in program order
    pub fn anchors(&self) -> Vec<InsnRef> {
        self.iter().map(|(anchor, _)| anchor).collect()
    }

    pub fn to_vec(&self) -> Vec<Instruction> {
        self.instructions().cloned().collect()
    }
}

pub struct Iter<'a> {
    stream: &'a InstructionStream,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InsnRef, &'a Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = &self.stream.nodes[index as usize];
        self.cursor = node.next;
        Some((self.stream.anchor(index), &node.instruction))
    }
}

impl Default for InstructionStream {
    fn default() -> Self {
        InstructionStream::new()
    }
}

/// Copies get a fresh identity: anchors into the original are foreign to the copy
impl Clone for InstructionStream {
    fn clone(&self) -> Self {
        self.instructions().cloned().collect()
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        let mut stream = InstructionStream::new();
        for instruction in iter {
            stream.push_back(instruction);
        }
        stream
    }
}

impl PartialEq for InstructionStream {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.instructions().eq(other.instructions())
    }
}

impl fmt::Debug for InstructionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.instructions()).finish()
    }
}

impl Serialize for InstructionStream {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.instructions())
    }
}

impl<'de> Deserialize<'de> for InstructionStream {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let instructions = Vec::<Instruction>::deserialize(deserializer)?;
        Ok(instructions.into_iter().collect())
    }
}
