//! Conversions between the values woven code has and the values handlers want
//!
//! These emit the usual boxing (`Integer.valueOf`), unboxing (`checkcast` + `intValue`),
//! primitive widening and reference casts. Anything else is a [`Error::TypeMismatch`].

use super::Error;
use crate::bytecode::code::{opcodes, Constant, Instruction, InvokeKind, MethodRef, RawInstruction};
use crate::bytecode::{
    BaseType, BinaryName, FieldType, RefType, RenderDescriptor, Signature, UnqualifiedName,
    ValueKind, ValueType,
};
use crate::util::Width;

fn mismatch(from: &ValueType, to: &ValueType) -> Error {
    Error::TypeMismatch(format!("cannot convert {} to {}", from.render(), to.render()))
}

/// Type used for a local of the given kind when nothing more precise is known
pub fn kind_type(kind: ValueKind) -> ValueType {
    match kind {
        ValueKind::Int => ValueType::int(),
        ValueKind::Long => ValueType::long(),
        ValueKind::Float => ValueType::float(),
        ValueKind::Double => ValueType::double(),
        ValueKind::Reference => ValueType::object(BinaryName::OBJECT),
    }
}

/// Convert the value at the top of the stack from one type to another
pub fn coerce(from: &ValueType, to: &ValueType, code: &mut Vec<Instruction>) -> Result<(), Error> {
    if from == to {
        return Ok(());
    }
    match (from, to) {
        (FieldType::Base(from_base), FieldType::Base(to_base)) => {
            widen(*from_base, *to_base, code).ok_or_else(|| mismatch(from, to))
        }
        (FieldType::Base(base), FieldType::Ref(RefType::Object(class))) => {
            let accepted = class == &BinaryName::OBJECT
                || class == &base.boxed_class()
                || (class == &BinaryName::NUMBER && base.is_numeric());
            if !accepted {
                return Err(mismatch(from, to));
            }
            box_value(*base, code);
            Ok(())
        }
        (FieldType::Ref(RefType::Object(class)), FieldType::Base(base)) => {
            let boxed = base.boxed_class();
            if class != &boxed {
                code.push(Instruction::CheckCast(RefType::Object(boxed)));
            }
            unbox_value(*base, code);
            Ok(())
        }
        (FieldType::Ref(_), FieldType::Ref(RefType::Object(class))) if class == &BinaryName::OBJECT => {
            Ok(())
        }
        (FieldType::Ref(_), FieldType::Ref(to_ref)) => {
            code.push(Instruction::CheckCast(to_ref.clone()));
            Ok(())
        }
        _ => Err(mismatch(from, to)),
    }
}

/// Widening conversion between primitives (`None` if there is none)
fn widen(from: BaseType, to: BaseType, code: &mut Vec<Instruction>) -> Option<()> {
    let int_like = |base: BaseType| base.value_kind() == ValueKind::Int;
    let opcode = match (from, to) {
        (from, BaseType::Int) if int_like(from) => return Some(()),
        (from, BaseType::Long) if int_like(from) && from != BaseType::Boolean => opcodes::I2L,
        (from, BaseType::Float) if int_like(from) && from != BaseType::Boolean => opcodes::I2F,
        (from, BaseType::Double) if int_like(from) && from != BaseType::Boolean => opcodes::I2D,
        (BaseType::Long, BaseType::Float) => opcodes::L2F,
        (BaseType::Long, BaseType::Double) => opcodes::L2D,
        (BaseType::Float, BaseType::Double) => opcodes::F2D,
        _ => return None,
    };
    let pops = from.width() as u8;
    let pushes = to.width() as u8;
    code.push(Instruction::Raw(RawInstruction::simple(opcode, pops, pushes)));
    Some(())
}

fn unbox_method_name(base: BaseType) -> UnqualifiedName {
    match base {
        BaseType::Boolean => UnqualifiedName::BOOLEANVALUE,
        BaseType::Byte => UnqualifiedName::BYTEVALUE,
        BaseType::Char => UnqualifiedName::CHARVALUE,
        BaseType::Short => UnqualifiedName::SHORTVALUE,
        BaseType::Int => UnqualifiedName::INTVALUE,
        BaseType::Long => UnqualifiedName::LONGVALUE,
        BaseType::Float => UnqualifiedName::FLOATVALUE,
        BaseType::Double => UnqualifiedName::DOUBLEVALUE,
    }
}

/// Box the primitive at the top of the stack (eg. `Integer.valueOf(I)Ljava/lang/Integer;`)
pub fn box_value(base: BaseType, code: &mut Vec<Instruction>) {
    let boxed = base.boxed_class();
    code.push(Instruction::Invoke(
        InvokeKind::Static,
        MethodRef {
            owner: boxed.clone(),
            name: UnqualifiedName::VALUEOF,
            descriptor: Signature {
                parameters: vec![FieldType::Base(base)],
                return_type: Some(FieldType::object(boxed)),
            },
        },
    ));
}

/// Unbox the boxed primitive at the top of the stack (eg. `Integer.intValue()I`)
pub fn unbox_value(base: BaseType, code: &mut Vec<Instruction>) {
    code.push(Instruction::Invoke(
        InvokeKind::Virtual,
        MethodRef {
            owner: base.boxed_class(),
            name: unbox_method_name(base),
            descriptor: Signature {
                parameters: vec![],
                return_type: Some(FieldType::Base(base)),
            },
        },
    ));
}

/// Push the zero value of a type (`0`, `0L`, `0.0F`, `0.0D` or `null`)
pub fn push_default(typ: &ValueType, code: &mut Vec<Instruction>) {
    code.push(Instruction::PushConstant(Constant::zero(typ.value_kind())));
}

/// Push the zero value of a type as an object (`null` for references and for `void`)
pub fn push_boxed_default(typ: Option<&ValueType>, code: &mut Vec<Instruction>) {
    match typ {
        Some(FieldType::Base(base)) => {
            push_default(&FieldType::Base(*base), code);
            box_value(*base, code);
        }
        Some(FieldType::Ref(_)) | None => code.push(Instruction::PushConstant(Constant::Null)),
    }
}
