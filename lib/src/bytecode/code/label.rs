use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque label, unique within one method body
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub u32);

impl LabelId {
    /// Get the next fresh label
    pub fn next(&self) -> LabelId {
        LabelId(self.0 + 1)
    }
}

/// Generates new labels
pub trait LabelGenerator<Label> {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator for [`LabelId`]
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone)]
pub struct LabelIdGenerator(LabelId);

impl LabelIdGenerator {
    pub fn new(start: LabelId) -> LabelIdGenerator {
        LabelIdGenerator(start)
    }
}

impl LabelGenerator<LabelId> for LabelIdGenerator {
    fn fresh_label(&mut self) -> LabelId {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for LabelId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}
