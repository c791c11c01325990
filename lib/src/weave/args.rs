use super::coerce::coerce;
use super::{locate, Edit, Error, InjectionPoint, Plan, Selector, WeaveContext};
use crate::bytecode::code::{Constant, InsnRef, Instruction, InvokeKind, MethodRef};
use crate::bytecode::model::MethodBody;
use crate::bytecode::{BinaryName, FieldType, Signature, UnqualifiedName, ValueKind, ValueType};
use log::debug;

/// Locate the calls whose arguments get modified
fn locate_calls(method: &MethodBody, at: &InjectionPoint) -> Result<Vec<(InsnRef, MethodRef)>, Error> {
    if !matches!(at.selector, Selector::BeforeCall { .. }) {
        return Err(Error::UnsupportedSelector(format!(
            "{} does not select calls",
            at.selector
        )));
    }
    let anchors = locate(method, at)?;
    if anchors.is_empty() {
        return Err(Error::NoMatchFound(at.selector.to_string()));
    }
    anchors
        .into_iter()
        .map(|anchor| match method.instructions.get(anchor)? {
            Instruction::Invoke(_, call) => Ok((anchor, call.clone())),
            other => Err(Error::UnsupportedSelector(format!("`{}` is not a call", other))),
        })
        .collect()
}

/// Plan passing one argument of each matched call through the handler
///
/// Only the arguments above the modified one are spilled to locals; the receiver and the
/// arguments below stay on the stack.
pub fn plan_modify_arg(
    cx: &WeaveContext,
    method: &MethodBody,
    at: &InjectionPoint,
    index: Option<usize>,
) -> Result<Plan, Error> {
    let calls = locate_calls(method, at)?;
    let (param, returned) = match (cx.handler.parameters(), cx.handler.return_type()) {
        ([param], Some(returned)) => (param, returned),
        _ => {
            return Err(Error::TypeMismatch(String::from(
                "argument handlers take one value and return one",
            )))
        }
    };

    let mut plan = Plan::new(method);
    for (anchor, call) in calls {
        let arguments = &call.descriptor.parameters;
        let index = match index {
            Some(index) if index < arguments.len() => index,
            Some(index) => {
                return Err(Error::TypeMismatch(format!(
                    "{} has no argument {}",
                    call.identity(),
                    index
                )))
            }
            None => infer_index(arguments, param).ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "cannot tell which argument of {} the handler takes",
                    call.identity()
                ))
            })?,
        };
        debug!(
            "{}.{}: {} on argument {} of {}",
            cx.class_name,
            method.identity(),
            cx.directive,
            index,
            call.identity()
        );

        let above = &arguments[index + 1..];
        let mut code = vec![];
        let mut slots = vec![];
        for argument in above {
            slots.push(plan.slots.allocate(argument.value_kind())?);
        }
        for (argument, slot) in above.iter().zip(&slots).rev() {
            code.push(Instruction::StoreLocal(*slot, argument.value_kind()));
        }

        let modified = &arguments[index];
        coerce(modified, param, &mut code)?;
        cx.handler.emit_call_on_top(&mut code, param);
        coerce(returned, modified, &mut code)?;

        for (argument, slot) in above.iter().zip(&slots) {
            code.push(Instruction::LoadLocal(*slot, argument.value_kind()));
        }
        plan.edits.push(Edit::InsertBefore(anchor, code));
    }
    Ok(plan)
}

/// The only argument with exactly the handler's parameter type
fn infer_index(arguments: &[ValueType], param: &ValueType) -> Option<usize> {
    let mut candidates = arguments
        .iter()
        .enumerate()
        .filter(|(_, argument)| *argument == param)
        .map(|(index, _)| index);
    match (candidates.next(), candidates.next()) {
        (Some(index), None) => Some(index),
        _ => None,
    }
}

fn view_method(view: &BinaryName, name: UnqualifiedName, descriptor: Signature) -> Instruction {
    let kind = if name == UnqualifiedName::INIT {
        InvokeKind::Special
    } else {
        InvokeKind::Virtual
    };
    Instruction::Invoke(
        kind,
        MethodRef {
            owner: view.clone(),
            name,
            descriptor,
        },
    )
}

/// Plan handing all arguments of each matched call to the handler through an argument view
pub fn plan_modify_args(
    cx: &WeaveContext,
    method: &MethodBody,
    at: &InjectionPoint,
) -> Result<Plan, Error> {
    let view = &cx.settings.argument_view;
    let view_type = ValueType::object(view.clone());
    if cx.handler.parameters() != [view_type] {
        return Err(Error::TypeMismatch(format!(
            "argument batch handlers take a single {}",
            view
        )));
    }
    let calls = locate_calls(method, at)?;
    let object = ValueType::object(BinaryName::OBJECT);

    let mut plan = Plan::new(method);
    for (anchor, call) in calls {
        let arguments = &call.descriptor.parameters;
        debug!(
            "{}.{}: {} on the {} arguments of {}",
            cx.class_name,
            method.identity(),
            cx.directive,
            arguments.len(),
            call.identity()
        );

        let mut code = vec![];
        let mut slots = vec![];
        for argument in arguments {
            slots.push(plan.slots.allocate(argument.value_kind())?);
        }
        for (argument, slot) in arguments.iter().zip(&slots).rev() {
            code.push(Instruction::StoreLocal(*slot, argument.value_kind()));
        }

        // Build the view
        let view_slot = plan.slots.allocate(ValueKind::Reference)?;
        code.push(Instruction::New(view.clone()));
        code.push(Instruction::Dup);
        code.push(Instruction::PushConstant(Constant::Int(arguments.len() as i32)));
        code.push(view_method(
            view,
            UnqualifiedName::INIT,
            Signature {
                parameters: vec![FieldType::int()],
                return_type: None,
            },
        ));
        code.push(Instruction::StoreLocal(view_slot, ValueKind::Reference));
        for (position, (argument, slot)) in arguments.iter().zip(&slots).enumerate() {
            code.push(Instruction::LoadLocal(view_slot, ValueKind::Reference));
            code.push(Instruction::PushConstant(Constant::Int(position as i32)));
            code.push(Instruction::LoadLocal(*slot, argument.value_kind()));
            coerce(argument, &object, &mut code)?;
            code.push(view_method(
                view,
                UnqualifiedName::SET,
                Signature {
                    parameters: vec![FieldType::int(), object.clone()],
                    return_type: None,
                },
            ));
        }

        cx.handler.emit_instance(&mut code);
        code.push(Instruction::LoadLocal(view_slot, ValueKind::Reference));
        cx.handler.emit_invoke(&mut code);
        if let Some(returned) = cx.handler.return_type() {
            code.push(Instruction::pop(returned.value_kind()));
        }

        // Put the (possibly modified) arguments back
        for (position, argument) in arguments.iter().enumerate() {
            code.push(Instruction::LoadLocal(view_slot, ValueKind::Reference));
            code.push(Instruction::PushConstant(Constant::Int(position as i32)));
            code.push(view_method(
                view,
                UnqualifiedName::GET,
                Signature {
                    parameters: vec![FieldType::int()],
                    return_type: Some(object.clone()),
                },
            ));
            coerce(&object, argument, &mut code)?;
        }
        plan.edits.push(Edit::InsertBefore(anchor, code));
    }
    Ok(plan)
}
