//! Weave externally written handler code into compiled methods
//!
//! The [`bytecode`] module models the classes being rewritten. The [`weave`] module locates
//! injection points in method bodies and splices in handler calls, keeping the stack and locals
//! bounds of every method valid.

pub mod bytecode;
pub mod util;
pub mod weave;
