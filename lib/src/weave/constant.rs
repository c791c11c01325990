use super::coerce::coerce;
use super::{locate_constants, ConstantMatch, Edit, Error, Plan, WeaveContext};
use crate::bytecode::model::MethodBody;
use log::debug;

/// Plan passing each matched literal through the handler, right after it is pushed
pub fn plan_modify_constant(
    cx: &WeaveContext,
    method: &MethodBody,
    constant: &ConstantMatch,
) -> Result<Plan, Error> {
    let anchors = locate_constants(method, constant, cx.settings.float_epsilon)?;
    if anchors.is_empty() {
        return Err(Error::NoMatchFound(format!(
            "constant {:?} #{}",
            constant.value, constant.ordinal
        )));
    }
    let (param, returned) = match (cx.handler.parameters(), cx.handler.return_type()) {
        ([param], Some(returned)) => (param, returned),
        _ => {
            return Err(Error::TypeMismatch(String::from(
                "constant handlers take one value and return one",
            )))
        }
    };

    let literal_type = constant.value.value_type();
    let mut plan = Plan::new(method);
    for anchor in anchors {
        debug!(
            "{}.{}: {} at `{}`",
            cx.class_name,
            method.identity(),
            cx.directive,
            method.instructions.get(anchor)?
        );
        let mut code = vec![];
        coerce(&literal_type, param, &mut code)?;
        cx.handler.emit_call_on_top(&mut code, param);
        coerce(returned, &literal_type, &mut code)?;
        plan.edits.push(Edit::InsertAfter(anchor, code));
    }
    Ok(plan)
}
