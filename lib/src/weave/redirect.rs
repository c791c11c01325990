use super::coerce::coerce;
use super::{locate, Edit, Error, InjectionPoint, Plan, Selector, WeaveContext};
use crate::bytecode::code::{FieldAccess, Instruction, InvokeKind};
use crate::bytecode::model::MethodBody;
use crate::bytecode::{UnqualifiedName, ValueType};
use log::debug;

/// What a call or field access takes off the stack and leaves on it
struct Site {
    consumed: Vec<ValueType>,
    produced: Option<ValueType>,
}

impl Site {
    fn of(instruction: &Instruction) -> Result<Site, Error> {
        match instruction {
            Instruction::Invoke(kind, method) => {
                if method.name == UnqualifiedName::INIT {
                    return Err(Error::UnsupportedSelector(String::from(
                        "constructor calls cannot be redirected",
                    )));
                }
                let mut consumed = vec![];
                if *kind != InvokeKind::Static {
                    consumed.push(ValueType::object(method.owner.clone()));
                }
                consumed.extend(method.descriptor.parameters.iter().cloned());
                Ok(Site {
                    consumed,
                    produced: method.descriptor.return_type.clone(),
                })
            }
            Instruction::Field(access, field) => {
                let owner = ValueType::object(field.owner.clone());
                let value = field.descriptor.clone();
                let (consumed, produced) = match access {
                    FieldAccess::GetField => (vec![owner], Some(value)),
                    FieldAccess::PutField => (vec![owner, value], None),
                    FieldAccess::GetStatic => (vec![], Some(value)),
                    FieldAccess::PutStatic => (vec![value], None),
                };
                Ok(Site { consumed, produced })
            }
            other => Err(Error::UnsupportedSelector(format!(
                "`{}` is not a call or field access",
                other
            ))),
        }
    }
}

/// Plan replacing each matched call or field access with a handler call
pub fn plan_redirect(
    cx: &WeaveContext,
    method: &MethodBody,
    at: &InjectionPoint,
) -> Result<Plan, Error> {
    match at.selector {
        Selector::BeforeCall { .. } | Selector::BeforeFieldAccess { .. } => (),
        _ => {
            return Err(Error::UnsupportedSelector(format!(
                "{} cannot be redirected",
                at.selector
            )))
        }
    }
    let anchors = locate(method, at)?;
    if anchors.is_empty() {
        return Err(Error::NoMatchFound(at.selector.to_string()));
    }

    let params = cx.handler.parameters();
    let mut plan = Plan::new(method);
    for anchor in anchors {
        let instruction = method.instructions.get(anchor)?;
        let site = Site::of(instruction)?;
        if site.consumed.len() != params.len() {
            return Err(Error::TypeMismatch(format!(
                "`{}` has {} operands but the handler takes {}",
                instruction,
                site.consumed.len(),
                params.len()
            )));
        }
        debug!(
            "{}.{}: {} replaces `{}`",
            cx.class_name,
            method.identity(),
            cx.directive,
            instruction
        );

        // Operands arrive with the last one on top, so they are stored in reverse
        let mut code = vec![];
        let mut slots = vec![];
        for operand in &site.consumed {
            slots.push(plan.slots.allocate(operand.value_kind())?);
        }
        for (operand, slot) in site.consumed.iter().zip(&slots).rev() {
            code.push(Instruction::StoreLocal(*slot, operand.value_kind()));
        }

        cx.handler.emit_instance(&mut code);
        for ((operand, slot), param) in site.consumed.iter().zip(&slots).zip(params) {
            code.push(Instruction::LoadLocal(*slot, operand.value_kind()));
            coerce(operand, param, &mut code)?;
        }
        cx.handler.emit_invoke(&mut code);

        match (cx.handler.return_type(), &site.produced) {
            (None, None) => (),
            (Some(returned), None) => code.push(Instruction::pop(returned.value_kind())),
            (None, Some(_)) => {
                return Err(Error::TypeMismatch(format!(
                    "handler returns nothing in place of `{}`",
                    instruction
                )))
            }
            (Some(returned), Some(produced)) => coerce(returned, produced, &mut code)?,
        }
        plan.edits.push(Edit::Replace(anchor, code));
    }
    Ok(plan)
}
