use super::coerce::{coerce, kind_type};
use super::{locate, Edit, Error, InjectionPoint, Placement, Plan, Selector, WeaveContext};
use crate::bytecode::code::Instruction;
use crate::bytecode::model::MethodBody;
use crate::bytecode::{ValueKind, ValueType};
use crate::util::Width;
use log::debug;

/// Plan passing a local variable through the handler
///
/// When locals are selected, a stored value is filtered on its way into the local and a loaded
/// one on its way out. With any other selector, `slot` is read, filtered and written back.
pub fn plan_modify_variable(
    cx: &WeaveContext,
    method: &MethodBody,
    at: &InjectionPoint,
    slot: Option<u16>,
) -> Result<Plan, Error> {
    let (param, returned) = match (cx.handler.parameters(), cx.handler.return_type()) {
        ([param], Some(returned)) => (param, returned),
        _ => {
            return Err(Error::TypeMismatch(String::from(
                "variable handlers take one value and return one",
            )))
        }
    };

    // Locals are only matched if they have the kind the handler deals with
    let mut point = at.clone();
    if let Selector::AtStoreOrLoad { kind, .. } = &mut point.selector {
        kind.get_or_insert(param.value_kind());
    }
    let anchors = locate(method, &point)?;
    if anchors.is_empty() {
        return Err(Error::NoMatchFound(point.selector.to_string()));
    }

    let locals = method.locals_in_use();
    let mut plan = Plan::new(method);
    for anchor in anchors {
        let instruction = method.instructions.get(anchor)?;
        debug!(
            "{}.{}: {} at `{}`",
            cx.class_name,
            method.identity(),
            cx.directive,
            instruction
        );
        let edit = match (&point.selector, instruction) {
            (Selector::AtStoreOrLoad { .. }, Instruction::StoreLocal(_, kind)) => {
                Edit::InsertBefore(anchor, filter(cx, *kind, param, returned)?)
            }
            (Selector::AtStoreOrLoad { .. }, Instruction::LoadLocal(_, kind)) => {
                Edit::InsertAfter(anchor, filter(cx, *kind, param, returned)?)
            }
            (_, other) => {
                let slot = slot.ok_or_else(|| {
                    Error::UnsupportedSelector(format!("no local slot given to modify at `{}`", other))
                })?;
                let kind = param.value_kind();
                if slot as usize + kind.width() > locals {
                    return Err(Error::UnsupportedSelector(format!(
                        "slot {} is not a local of {}",
                        slot,
                        method.identity()
                    )));
                }
                let mut code = vec![Instruction::LoadLocal(slot, kind)];
                code.extend(filter(cx, kind, param, returned)?);
                code.push(Instruction::StoreLocal(slot, kind));
                match at.placement {
                    Placement::Before => Edit::InsertBefore(anchor, code),
                    Placement::After if matches!(other, Instruction::Return(_)) => {
                        return Err(Error::UnsupportedSelector(String::from(
                            "cannot modify a variable after a return",
                        )))
                    }
                    Placement::After => Edit::InsertAfter(anchor, code),
                }
            }
        };
        plan.edits.push(edit);
    }
    Ok(plan)
}

/// Run the value of a local (at the top of the stack) through the handler
fn filter(
    cx: &WeaveContext,
    kind: ValueKind,
    param: &ValueType,
    returned: &ValueType,
) -> Result<Vec<Instruction>, Error> {
    let local_type = match kind {
        ValueKind::Int if param.value_kind() == ValueKind::Int => param.clone(),
        _ => kind_type(kind),
    };
    let mut code = vec![];
    coerce(&local_type, param, &mut code)?;
    cx.handler.emit_call_on_top(&mut code, param);
    coerce(returned, &local_type, &mut code)?;
    Ok(code)
}
