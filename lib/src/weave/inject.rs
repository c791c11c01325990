use super::coerce::{coerce, push_boxed_default, push_default};
use super::{locate, Edit, Error, InjectionPoint, Placement, Plan, Selector, WeaveContext};
use crate::bytecode::code::{
    Condition, Constant, Instruction, InvokeKind, LabelGenerator, LabelIdGenerator, MethodRef,
};
use crate::bytecode::model::MethodBody;
use crate::bytecode::{
    BinaryName, FieldType, RefType, Signature, UnqualifiedName, ValueKind, ValueType,
};
use log::debug;

/// Handler parameter, as the injected call will supply it
enum Supplied<'a> {
    /// The cancellation token (of the given class)
    Token(&'a BinaryName),

    /// The next argument of the target method, converted to this type
    Argument(&'a ValueType),
}

/// Plan a handler call at each injection point
pub fn plan_inject(
    cx: &WeaveContext,
    method: &MethodBody,
    at: &InjectionPoint,
    cancellable: bool,
) -> Result<Plan, Error> {
    let anchors = locate(method, at)?;
    if anchors.is_empty() {
        return Err(Error::NoMatchFound(at.selector.to_string()));
    }
    let placement = match at.selector {
        Selector::Head | Selector::TailOrReturn => Placement::Before,
        _ => at.placement,
    };
    if cancellable && method.is_constructor() && at.selector != Selector::TailOrReturn {
        return Err(Error::UnsupportedSelector(String::from(
            "constructors can only be cancelled at a return",
        )));
    }

    let supplied = classify_parameters(cx, method)?;
    let token_class = supplied.iter().find_map(|param| match param {
        Supplied::Token(class) => Some(*class),
        Supplied::Argument(_) => None,
    });
    if cancellable && token_class.is_none() {
        debug!(
            "{}.{}: {} is cancellable but takes no token, so it cannot cancel",
            cx.class_name,
            method.identity(),
            cx.directive
        );
    }

    let mut plan = Plan::new(method);
    let mut labels = LabelIdGenerator::new(method.next_free_label());
    for anchor in anchors {
        let instruction = method.instructions.get(anchor)?;
        if placement == Placement::After && matches!(instruction, Instruction::Return(_)) {
            return Err(Error::UnsupportedSelector(String::from(
                "cannot inject after a return",
            )));
        }
        debug!(
            "{}.{}: {} {:?} `{}`",
            cx.class_name,
            method.identity(),
            cx.directive,
            placement,
            instruction
        );

        let mut code = vec![];
        let token_slot = match token_class {
            Some(class) => {
                let slot = plan.slots.allocate(ValueKind::Reference)?;
                emit_token(cx, method, class, cancellable, &mut code);
                code.push(Instruction::StoreLocal(slot, ValueKind::Reference));
                Some(slot)
            }
            None => None,
        };

        cx.handler.emit_instance(&mut code);
        let mut argument_index = 0;
        for param in &supplied {
            match param {
                Supplied::Token(_) => {
                    if let Some(slot) = token_slot {
                        code.push(Instruction::LoadLocal(slot, ValueKind::Reference));
                    }
                }
                Supplied::Argument(param_type) => {
                    let (slot, arg_type) = method.argument_slot(argument_index).ok_or_else(|| {
                        Error::TypeMismatch(format!(
                            "handler takes more arguments than {}",
                            method.identity()
                        ))
                    })?;
                    code.push(Instruction::LoadLocal(slot, arg_type.value_kind()));
                    coerce(arg_type, param_type, &mut code)?;
                    argument_index += 1;
                }
            }
        }
        cx.handler.emit_invoke(&mut code);
        if let Some(return_type) = cx.handler.return_type() {
            code.push(Instruction::pop(return_type.value_kind()));
        }

        if let (true, Some(class), Some(slot)) = (cancellable, token_class, token_slot) {
            let skip = labels.fresh_label();
            code.push(Instruction::LoadLocal(slot, ValueKind::Reference));
            code.push(Instruction::Invoke(
                InvokeKind::Virtual,
                MethodRef {
                    owner: class.clone(),
                    name: UnqualifiedName::ISCANCELLED,
                    descriptor: Signature {
                        parameters: vec![],
                        return_type: Some(FieldType::boolean()),
                    },
                },
            ));
            code.push(Instruction::Branch(Condition::IfZero, skip));
            emit_early_return(cx, method, class, slot, &mut code)?;
            code.push(Instruction::Label(skip));
        }

        plan.edits.push(match placement {
            Placement::Before => Edit::InsertBefore(anchor, code),
            Placement::After => Edit::InsertAfter(anchor, code),
        });
    }
    Ok(plan)
}

fn classify_parameters<'a>(
    cx: &WeaveContext<'a>,
    method: &MethodBody,
) -> Result<Vec<Supplied<'a>>, Error> {
    let mut supplied = vec![];
    let mut tokens = 0;
    for param in cx.handler.parameters() {
        match param {
            FieldType::Ref(RefType::Object(class)) if cx.settings.is_token(class) => {
                tokens += 1;
                supplied.push(Supplied::Token(class));
            }
            other => supplied.push(Supplied::Argument(other)),
        }
    }
    if tokens > 1 {
        return Err(Error::TypeMismatch(String::from(
            "handler takes more than one token",
        )));
    }
    if supplied.len() - tokens > method.descriptor.parameters.len() {
        return Err(Error::TypeMismatch(format!(
            "handler takes more arguments than {}",
            method.identity()
        )));
    }
    Ok(supplied)
}

/// Construct a token for this method (the returnable kind gets a boxed default return value)
fn emit_token(
    cx: &WeaveContext,
    method: &MethodBody,
    class: &BinaryName,
    cancellable: bool,
    code: &mut Vec<Instruction>,
) {
    let mut parameters = vec![ValueType::object(BinaryName::STRING), ValueType::boolean()];
    code.push(Instruction::New(class.clone()));
    code.push(Instruction::Dup);
    code.push(Instruction::PushConstant(Constant::String(format!(
        "{}.{}",
        cx.class_name,
        method.identity()
    ))));
    code.push(Instruction::PushConstant(Constant::Int(cancellable as i32)));
    if class == &cx.settings.returnable_token {
        push_boxed_default(method.descriptor.return_type.as_ref(), code);
        parameters.push(ValueType::object(BinaryName::OBJECT));
    }
    code.push(Instruction::Invoke(
        InvokeKind::Special,
        MethodRef {
            owner: class.clone(),
            name: UnqualifiedName::INIT,
            descriptor: Signature {
                parameters,
                return_type: None,
            },
        },
    ));
}

/// Return from the target method, with the token's value if it carries one
fn emit_early_return(
    cx: &WeaveContext,
    method: &MethodBody,
    class: &BinaryName,
    token_slot: u16,
    code: &mut Vec<Instruction>,
) -> Result<(), Error> {
    let return_type = match &method.descriptor.return_type {
        None => {
            code.push(Instruction::Return(None));
            return Ok(());
        }
        Some(return_type) => return_type,
    };
    if class == &cx.settings.returnable_token {
        let object = ValueType::object(BinaryName::OBJECT);
        code.push(Instruction::LoadLocal(token_slot, ValueKind::Reference));
        code.push(Instruction::Invoke(
            InvokeKind::Virtual,
            MethodRef {
                owner: class.clone(),
                name: UnqualifiedName::GETRETURNVALUE,
                descriptor: Signature {
                    parameters: vec![],
                    return_type: Some(object.clone()),
                },
            },
        ));
        coerce(&object, return_type, code)?;
    } else {
        push_default(return_type, code);
    }
    code.push(Instruction::Return(Some(return_type.value_kind())));
    Ok(())
}
