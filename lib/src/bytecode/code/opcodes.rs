//! Opcodes for the [`super::RawInstruction`]s the engine emits or understands
//!
//! Anything not expressible as one of the structured [`super::Instruction`] variants travels as a
//! raw opcode with its operand bytes. Only the handful below get named.

pub const NOP: u8 = 0x00;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const IADD: u8 = 0x60;
pub const LADD: u8 = 0x61;
pub const DADD: u8 = 0x63;
pub const ISUB: u8 = 0x64;
pub const LSUB: u8 = 0x65;
pub const IMUL: u8 = 0x68;
pub const LMUL: u8 = 0x69;
pub const I2L: u8 = 0x85;
pub const I2F: u8 = 0x86;
pub const I2D: u8 = 0x87;
pub const L2F: u8 = 0x89;
pub const L2D: u8 = 0x8a;
pub const F2D: u8 = 0x8d;
pub const IINC: u8 = 0x84;
pub const ATHROW: u8 = 0xbf;
