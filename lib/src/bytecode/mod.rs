//! Model of compiled classes, as far as the weaver needs one
//!
//! Classes are held in a structured, editable form rather than as class files: names and
//! descriptors use the usual JVM syntax (`java/lang/Object`, `(IJ)Ljava/lang/String;`), but code
//! is a linked list of [`code::Instruction`]s with symbolic labels.
//!
//! ```
//! use weaver::bytecode::code::{Instruction, InstructionStream};
//! use weaver::bytecode::model::{ClassDefinition, MethodBody};
//! use weaver::bytecode::*;
//!
//! # fn make_class() -> Result<ClassDefinition, Error> {
//! let mut code = InstructionStream::new();
//! code.push_back(Instruction::LoadLocal(0, ValueKind::Int));
//! code.push_back(Instruction::LoadLocal(1, ValueKind::Int));
//! code.push_back(Instruction::Raw(code::RawInstruction::simple(code::opcodes::IADD, 2, 1)));
//! code.push_back(Instruction::Return(Some(ValueKind::Int)));
//!
//! let add = MethodBody::new(
//!     UnqualifiedName::from_string(String::from("add")).map_err(Error::MalformedName)?,
//!     Signature::parse("(II)I").map_err(|err| Error::BadDescriptor(String::from("(II)I"), err))?,
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     code,
//! )?;
//! assert_eq!(add.max_stack, 2);
//! assert_eq!(add.max_locals, 2);
//!
//! let mut class = ClassDefinition::new(
//!     BinaryName::from_string(String::from("me/example/Adder")).map_err(Error::MalformedName)?,
//! );
//! class.add_method(add)?;
//! # Ok(class)
//! # }
//! # make_class().unwrap();
//! ```

mod access_flags;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
