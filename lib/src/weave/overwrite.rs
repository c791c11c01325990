use super::{Edit, Error, Plan, WeaveContext};
use crate::bytecode::code::{FieldRef, Instruction, MethodRef};
use crate::bytecode::model::MethodBody;
use crate::bytecode::BinaryName;
use log::debug;

/// Plan replacing the method body with a copy of the handler's body
///
/// Calls and field accesses on the handler class are moved onto the target class, so a handler
/// written against its own helpers keeps working once copied.
pub fn plan_overwrite(cx: &WeaveContext, method: &MethodBody) -> Result<Plan, Error> {
    let handler = cx.handler.body;
    if handler.descriptor != method.descriptor || handler.is_static() != method.is_static() {
        return Err(Error::TypeMismatch(format!(
            "{} cannot stand in for {}",
            cx.handler.reference,
            method.identity()
        )));
    }
    if handler.instructions.is_empty() {
        return Err(Error::HandlerUnresolved(format!(
            "{} has no code",
            cx.handler.reference
        )));
    }
    debug!(
        "{}.{}: {} replaces {} instructions with {}",
        cx.class_name,
        method.identity(),
        cx.directive,
        method.instructions.len(),
        handler.instructions.len()
    );

    let owner = &cx.handler.reference.owner;
    let instructions = handler
        .instructions
        .instructions()
        .map(|instruction| retarget(instruction, owner, cx.class_name))
        .collect();

    let mut plan = Plan::new(method);
    plan.edits.push(Edit::ReplaceBody {
        instructions,
        max_stack: handler.max_stack,
        max_locals: handler.max_locals.max(method.parameter_length() as u16),
    });
    Ok(plan)
}

fn retarget(instruction: &Instruction, from: &BinaryName, to: &BinaryName) -> Instruction {
    match instruction {
        Instruction::Invoke(kind, method) if &method.owner == from => Instruction::Invoke(
            *kind,
            MethodRef {
                owner: to.clone(),
                ..method.clone()
            },
        ),
        Instruction::Field(access, field) if &field.owner == from => Instruction::Field(
            *access,
            FieldRef {
                owner: to.clone(),
                ..field.clone()
            },
        ),
        other => other.clone(),
    }
}
