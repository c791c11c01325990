use super::{opcodes, LabelId};
use crate::bytecode::{
    BinaryName, RefType, RenderDescriptor, Signature, UnqualifiedName, ValueKind, ValueType,
};
use crate::util::Width;
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal values that can be pushed onto the stack
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Constant {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Constant::Int(_) => ValueKind::Int,
            Constant::Long(_) => ValueKind::Long,
            Constant::Float(_) => ValueKind::Float,
            Constant::Double(_) => ValueKind::Double,
            Constant::Null | Constant::String(_) => ValueKind::Reference,
        }
    }

    /// Static type of the literal (`null` is typed as `java/lang/Object`)
    pub fn value_type(&self) -> ValueType {
        match self {
            Constant::Int(_) => ValueType::int(),
            Constant::Long(_) => ValueType::long(),
            Constant::Float(_) => ValueType::float(),
            Constant::Double(_) => ValueType::double(),
            Constant::String(_) => ValueType::object(BinaryName::STRING),
            Constant::Null => ValueType::object(BinaryName::OBJECT),
        }
    }

    /// Zero value of a type, as it would be pushed (`null` for references)
    pub fn zero(kind: ValueKind) -> Constant {
        match kind {
            ValueKind::Int => Constant::Int(0),
            ValueKind::Long => Constant::Long(0),
            ValueKind::Float => Constant::Float(0.0),
            ValueKind::Double => Constant::Double(0.0),
            ValueKind::Reference => Constant::Null,
        }
    }
}

/// Reference to a method, as it appears at a call site
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: Signature,
}

impl MethodRef {
    /// Identity used when matching call sites (eg. `com/example/Foo.bar(II)I`)
    pub fn identity(&self) -> String {
        format!(
            "{}.{}{}",
            self.owner.as_ref(),
            self.name.as_ref(),
            self.descriptor.render()
        )
    }
}

/// Reference to a field, as it appears at an access site
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: ValueType,
}

impl FieldRef {
    /// Identity used when matching field accesses (eg. `com/example/Foo.count:I`)
    pub fn identity(&self) -> String {
        format!(
            "{}.{}:{}",
            self.owner.as_ref(),
            self.name.as_ref(),
            self.descriptor.render()
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
    Interface,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldAccess {
    GetField,
    PutField,
    GetStatic,
    PutStatic,
}

impl FieldAccess {
    pub fn is_static(&self) -> bool {
        matches!(self, FieldAccess::GetStatic | FieldAccess::PutStatic)
    }
}

/// Branch condition, testing the top of the stack (except for `Always`)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Always,
    IfZero,
    IfNonZero,
    IfNegative,
    IfNonNegative,
    IfPositive,
    IfNonPositive,
    IfNull,
    IfNonNull,
}

/// An instruction the engine does not interpret
///
/// The stack effect is declared by whoever built it, since nothing else knows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub opcode: u8,
    #[serde(default)]
    pub operands: Vec<u8>,
    pub pops: u8,
    pub pushes: u8,
}

impl RawInstruction {
    /// Raw instruction with no operands
    pub fn simple(opcode: u8, pops: u8, pushes: u8) -> RawInstruction {
        RawInstruction {
            opcode,
            operands: vec![],
            pops,
            pushes,
        }
    }

    /// Read a signed byte operand
    pub fn operand_i8(&self, at: usize) -> Option<i8> {
        self.operands.get(at).map(|byte| *byte as i8)
    }

    /// Read a big-endian signed 16-bit operand (eg. for `sipush`)
    pub fn operand_i16(&self, at: usize) -> Option<i16> {
        self.operands.get(at..at + 2).map(BigEndian::read_i16)
    }

    /// Read a big-endian unsigned 16-bit operand
    pub fn operand_u16(&self, at: usize) -> Option<u16> {
        self.operands.get(at..at + 2).map(BigEndian::read_u16)
    }
}

/// Stack effect of an instruction, measured in slots
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

impl StackEffect {
    const fn new(pops: usize, pushes: usize) -> StackEffect {
        StackEffect { pops, pushes }
    }
}

/// One entry of a method body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    PushConstant(Constant),
    LoadLocal(u16, ValueKind),
    StoreLocal(u16, ValueKind),
    Invoke(InvokeKind, MethodRef),
    Field(FieldAccess, FieldRef),
    New(BinaryName),
    CheckCast(RefType<BinaryName>),
    Dup,
    DupX1,
    DupX2,
    Swap,
    Pop,
    Pop2,
    Branch(Condition, LabelId),
    Return(Option<ValueKind>),
    Label(LabelId),
    Raw(RawInstruction),
}

impl Instruction {
    /// How many stack slots this instruction consumes and produces
    pub fn stack_effect(&self) -> StackEffect {
        match self {
            Instruction::PushConstant(constant) => StackEffect::new(0, constant.value_kind().width()),
            Instruction::LoadLocal(_, kind) => StackEffect::new(0, kind.width()),
            Instruction::StoreLocal(_, kind) => StackEffect::new(kind.width(), 0),
            Instruction::Invoke(invoke_kind, method) => {
                let has_receiver = *invoke_kind != InvokeKind::Static;
                StackEffect::new(
                    method.descriptor.parameter_length(has_receiver),
                    method.descriptor.return_width(),
                )
            }
            Instruction::Field(access, field) => {
                let width = field.descriptor.width();
                match access {
                    FieldAccess::GetField => StackEffect::new(1, width),
                    FieldAccess::PutField => StackEffect::new(1 + width, 0),
                    FieldAccess::GetStatic => StackEffect::new(0, width),
                    FieldAccess::PutStatic => StackEffect::new(width, 0),
                }
            }
            Instruction::New(_) => StackEffect::new(0, 1),
            Instruction::CheckCast(_) => StackEffect::new(1, 1),
            Instruction::Dup => StackEffect::new(1, 2),
            Instruction::DupX1 => StackEffect::new(2, 3),
            Instruction::DupX2 => StackEffect::new(3, 4),
            Instruction::Swap => StackEffect::new(2, 2),
            Instruction::Pop => StackEffect::new(1, 0),
            Instruction::Pop2 => StackEffect::new(2, 0),
            Instruction::Branch(Condition::Always, _) => StackEffect::new(0, 0),
            Instruction::Branch(_, _) => StackEffect::new(1, 0),
            Instruction::Return(kind) => StackEffect::new(kind.map_or(0, |k| k.width()), 0),
            Instruction::Label(_) => StackEffect::new(0, 0),
            Instruction::Raw(raw) => StackEffect::new(raw.pops as usize, raw.pushes as usize),
        }
    }

    /// Does control never fall through to the next instruction?
    pub fn is_terminal(&self) -> bool {
        match self {
            Instruction::Return(_) | Instruction::Branch(Condition::Always, _) => true,
            Instruction::Raw(raw) => raw.opcode == opcodes::ATHROW,
            _ => false,
        }
    }

    /// Label this instruction may jump to
    pub fn jump_target(&self) -> Option<LabelId> {
        match self {
            Instruction::Branch(_, label) => Some(*label),
            _ => None,
        }
    }

    /// Instruction popping a value of the given kind
    pub fn pop(kind: ValueKind) -> Instruction {
        if kind.width() == 2 {
            Instruction::Pop2
        } else {
            Instruction::Pop
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushConstant(Constant::Null) => write!(f, "aconst_null"),
            Instruction::PushConstant(Constant::String(s)) => write!(f, "ldc {:?}", s),
            Instruction::PushConstant(Constant::Int(i)) => write!(f, "ldc {}", i),
            Instruction::PushConstant(Constant::Long(l)) => write!(f, "ldc {}L", l),
            Instruction::PushConstant(Constant::Float(x)) => write!(f, "ldc {}F", x),
            Instruction::PushConstant(Constant::Double(x)) => write!(f, "ldc {}D", x),
            Instruction::LoadLocal(slot, kind) => write!(f, "{}load {}", kind.prefix(), slot),
            Instruction::StoreLocal(slot, kind) => write!(f, "{}store {}", kind.prefix(), slot),
            Instruction::Invoke(kind, method) => {
                let mnemonic = match kind {
                    InvokeKind::Static => "invokestatic",
                    InvokeKind::Virtual => "invokevirtual",
                    InvokeKind::Special => "invokespecial",
                    InvokeKind::Interface => "invokeinterface",
                };
                write!(f, "{} {}", mnemonic, method.identity())
            }
            Instruction::Field(access, field) => {
                let mnemonic = match access {
                    FieldAccess::GetField => "getfield",
                    FieldAccess::PutField => "putfield",
                    FieldAccess::GetStatic => "getstatic",
                    FieldAccess::PutStatic => "putstatic",
                };
                write!(f, "{} {}", mnemonic, field.identity())
            }
            Instruction::New(class) => write!(f, "new {}", class),
            Instruction::CheckCast(ref_type) => write!(f, "checkcast {}", ref_type.render()),
            Instruction::Dup => write!(f, "dup"),
            Instruction::DupX1 => write!(f, "dup_x1"),
            Instruction::DupX2 => write!(f, "dup_x2"),
            Instruction::Swap => write!(f, "swap"),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Pop2 => write!(f, "pop2"),
            Instruction::Branch(condition, label) => {
                let mnemonic = match condition {
                    Condition::Always => "goto",
                    Condition::IfZero => "ifeq",
                    Condition::IfNonZero => "ifne",
                    Condition::IfNegative => "iflt",
                    Condition::IfNonNegative => "ifge",
                    Condition::IfPositive => "ifgt",
                    Condition::IfNonPositive => "ifle",
                    Condition::IfNull => "ifnull",
                    Condition::IfNonNull => "ifnonnull",
                };
                write!(f, "{} {}", mnemonic, label)
            }
            Instruction::Return(None) => write!(f, "return"),
            Instruction::Return(Some(kind)) => write!(f, "{}return", kind.prefix()),
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::Raw(raw) => {
                write!(f, "raw 0x{:02x}", raw.opcode)?;
                for byte in &raw.operands {
                    write!(f, " {:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
