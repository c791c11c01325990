use super::{ConstantMatch, Error, InjectionPoint, LocalAccess, Selector};
use crate::bytecode::code::{opcodes, Constant, InsnRef, Instruction, InstructionStream};
use crate::bytecode::model::MethodBody;
use std::cmp::Ordering;

/// Find the anchors an injection point refers to, in program order
///
/// An empty result is not an error here: the caller decides whether zero matches matters.
pub fn locate(method: &MethodBody, point: &InjectionPoint) -> Result<Vec<InsnRef>, Error> {
    let stream = &method.instructions;
    let matches: Vec<InsnRef> = match &point.selector {
        Selector::Head => stream.first().into_iter().collect(),
        Selector::TailOrReturn => filter(stream, |instruction| {
            matches!(instruction, Instruction::Return(_))
        }),
        Selector::BeforeCall { target, ordinal } => {
            let found = filter(stream, |instruction| match instruction {
                Instruction::Invoke(_, method) => target.matches(&method.identity()),
                _ => false,
            });
            select_ordinal(found, *ordinal)?
        }
        Selector::BeforeFieldAccess { target, ordinal } => {
            let found = filter(stream, |instruction| match instruction {
                Instruction::Field(_, field) => target.matches(&field.identity()),
                _ => false,
            });
            select_ordinal(found, *ordinal)?
        }
        Selector::BeforeNew { target, ordinal } => {
            let found = filter(stream, |instruction| match instruction {
                Instruction::New(class) => target.matches(class.as_ref()),
                _ => false,
            });
            select_ordinal(found, *ordinal)?
        }
        Selector::AtStoreOrLoad {
            access,
            slot,
            kind,
            ordinal,
        } => {
            let found = filter(stream, |instruction| {
                let (local_slot, local_kind) = match (access, instruction) {
                    (LocalAccess::Store, Instruction::StoreLocal(s, k)) => (s, k),
                    (LocalAccess::Load, Instruction::LoadLocal(s, k)) => (s, k),
                    _ => return false,
                };
                slot.map_or(true, |slot| slot == *local_slot)
                    && kind.map_or(true, |kind| kind == *local_kind)
            });
            select_ordinal(found, *ordinal)?
        }
    };

    let mut anchors: Vec<InsnRef> = Vec::with_capacity(matches.len());
    for anchor in matches {
        let shifted = shift(stream, anchor, point.shift)?;
        if !anchors.contains(&shifted) {
            anchors.push(shifted);
        }
    }
    Ok(anchors)
}

/// Find the literal pushes matching a constant, in program order
pub fn locate_constants(
    method: &MethodBody,
    constant: &ConstantMatch,
    epsilon: f64,
) -> Result<Vec<InsnRef>, Error> {
    let found = filter(&method.instructions, |instruction| {
        pushed_constant(instruction)
            .map_or(false, |pushed| constants_match(&pushed, &constant.value, epsilon))
    });
    select_ordinal(found, constant.ordinal)
}

fn filter(stream: &InstructionStream, predicate: impl Fn(&Instruction) -> bool) -> Vec<InsnRef> {
    stream
        .iter()
        .filter(|(_, instruction)| predicate(instruction))
        .map(|(anchor, _)| anchor)
        .collect()
}

/// Keep only the `ordinal`-th match (or all of them for -1)
fn select_ordinal(found: Vec<InsnRef>, ordinal: i32) -> Result<Vec<InsnRef>, Error> {
    match ordinal.cmp(&0) {
        Ordering::Less if ordinal == -1 => Ok(found),
        Ordering::Less => Err(Error::UnsupportedSelector(format!(
            "ordinal {} (expected -1 or a non-negative index)",
            ordinal
        ))),
        _ => Ok(found.get(ordinal as usize).copied().into_iter().collect()),
    }
}

/// Walk an anchor along the stream, stopping at either end
fn shift(stream: &InstructionStream, mut anchor: InsnRef, by: i32) -> Result<InsnRef, Error> {
    for _ in 0..by.unsigned_abs() {
        let moved = if by > 0 {
            stream.next(anchor)?
        } else {
            stream.prev(anchor)?
        };
        match moved {
            Some(moved) => anchor = moved,
            None => break,
        }
    }
    Ok(anchor)
}

/// Constant pushed by an instruction, including the short `bipush`/`sipush` encodings
pub fn pushed_constant(instruction: &Instruction) -> Option<Constant> {
    match instruction {
        Instruction::PushConstant(constant) => Some(constant.clone()),
        Instruction::Raw(raw) if raw.opcode == opcodes::BIPUSH => {
            raw.operand_i8(0).map(|byte| Constant::Int(byte as i32))
        }
        Instruction::Raw(raw) if raw.opcode == opcodes::SIPUSH => {
            raw.operand_i16(0).map(|short| Constant::Int(short as i32))
        }
        _ => None,
    }
}

fn constants_match(pushed: &Constant, wanted: &Constant, epsilon: f64) -> bool {
    match (pushed, wanted) {
        (Constant::Null, Constant::Null) => true,
        (Constant::Int(a), Constant::Int(b)) => a == b,
        (Constant::Long(a), Constant::Long(b)) => a == b,
        (Constant::Float(a), Constant::Float(b)) => {
            a == b || (*a as f64 - *b as f64).abs() <= epsilon
        }
        (Constant::Double(a), Constant::Double(b)) => a == b || (a - b).abs() <= epsilon,
        (Constant::String(a), Constant::String(b)) => a == b,
        _ => false,
    }
}
