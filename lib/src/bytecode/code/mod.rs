//! Method bodies as mutable instruction streams
//!
//! The engine never works with encoded bytecode offsets. A body is a list of structured
//! [`Instruction`]s (with [`Instruction::Raw`] as the escape hatch), held in an
//! [`InstructionStream`] whose anchors stay valid across edits. Jumps refer to [`LabelId`]s,
//! which are placed in the stream with [`Instruction::Label`].

mod analysis;
mod instruction;
mod label;
pub mod opcodes;
mod stream;

pub use analysis::*;
pub use instruction::*;
pub use label::*;
pub use stream::*;
