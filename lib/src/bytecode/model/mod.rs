//! In-memory representation of the classes being woven
//!
//!   - __Class__ is represented using [`ClassDefinition`]
//!   - __Method__ is represented using [`MethodBody`]
//!   - __Field__ is represented using [`FieldDeclaration`]
//!
//! These are produced by whatever loads or compiles classes and handed to the weaver read-write.

mod class;
mod field;
mod method;

pub use class::*;
pub use field::*;
pub use method::*;
