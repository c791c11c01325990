mod harness;

use harness::*;
use weaver::bytecode::code::{opcodes, Instruction};
use weaver::bytecode::model::ClassDefinition;
use weaver::bytecode::ValueKind;
use weaver::weave::{
    weave, DirectiveKind, Error, HandlerLibrary, InjectionPoint, Selector, Settings, WeaveStatus,
};

const RETURNABLE: &str = "weaver/runtime/ReturnableToken";
const CANCELLABLE: &str = "weaver/runtime/CancellationToken";

/// `compute(II)I` adds its arguments, and records that it ran
fn service() -> ClassDefinition {
    class(
        "app/Service",
        vec![
            method(
                "compute",
                "(II)I",
                INSTANCE,
                vec![
                    probe_hit(),
                    Instruction::LoadLocal(1, ValueKind::Int),
                    Instruction::LoadLocal(2, ValueKind::Int),
                    raw(opcodes::IADD, 2, 1),
                    Instruction::Return(Some(ValueKind::Int)),
                ],
            ),
            method(
                "<init>",
                "()V",
                INSTANCE,
                vec![
                    Instruction::LoadLocal(0, ValueKind::Reference),
                    invoke_special("java/lang/Object", "<init>", "()V"),
                    probe_hit(),
                    Instruction::Return(None),
                ],
            ),
        ],
    )
}

fn hooks() -> ClassDefinition {
    let returnable = format!("(L{};)V", RETURNABLE);
    let plain = format!("(L{};)V", CANCELLABLE);
    class(
        "mods/ServiceHooks",
        vec![
            method(
                "answer",
                &returnable,
                INSTANCE,
                vec![
                    Instruction::LoadLocal(1, ValueKind::Reference),
                    push_int(42),
                    invoke_static("java/lang/Integer", "valueOf", "(I)Ljava/lang/Integer;"),
                    invoke_virtual(RETURNABLE, "setReturnValue", "(Ljava/lang/Object;)V"),
                    Instruction::Return(None),
                ],
            ),
            method(
                "observe",
                &format!("(IIL{};)V", CANCELLABLE),
                STATIC,
                vec![
                    Instruction::LoadLocal(0, ValueKind::Int),
                    Instruction::LoadLocal(1, ValueKind::Int),
                    raw(opcodes::IADD, 2, 1),
                    invoke_static("probe/Probe", "record", "(I)V"),
                    Instruction::Return(None),
                ],
            ),
            method(
                "veto",
                &plain,
                STATIC,
                vec![
                    Instruction::LoadLocal(0, ValueKind::Reference),
                    invoke_virtual(CANCELLABLE, "cancel", "()V"),
                    Instruction::Return(None),
                ],
            ),
            method("touch", "()V", STATIC, vec![probe_hit(), Instruction::Return(None)]),
            method(
                "twoTokens",
                &format!("(L{};L{};)V", CANCELLABLE, RETURNABLE),
                STATIC,
                vec![Instruction::Return(None)],
            ),
        ],
    )
}

fn inject_at(selector: Selector, cancellable: bool) -> DirectiveKind {
    DirectiveKind::Inject {
        at: InjectionPoint::new(selector),
        cancellable,
    }
}

fn run_compute(woven: ClassDefinition) -> (Result<Option<Value>, Trap>, Machine) {
    let mut machine = Machine::new(vec![woven, hooks()]);
    let result = machine.call_virtual("app/Service", "compute", "(II)I", &[Value::Int(1), Value::Int(2)]);
    (result, machine)
}

#[test]
fn cancelled_call_returns_handler_value() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler("mods/ServiceHooks", "answer", &format!("(L{};)V", RETURNABLE)),
        inject_at(Selector::Head, true),
    );
    let (woven, outcomes) = weave(service(), &[directive], &Settings::new(), &handlers);
    assert!(outcomes[0].is_applied(), "{:?}", outcomes[0]);
    assert_eq!(outcomes[0].points, 1);

    let (result, machine) = run_compute(woven);
    assert_eq!(result, Ok(Some(Value::Int(42))));

    // Only the constructor ran its probe, the original body never did
    assert_eq!(machine.probes, 1);
}

#[test]
fn handler_sees_arguments_and_lets_method_run() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler("mods/ServiceHooks", "observe", &format!("(IIL{};)V", CANCELLABLE)),
        inject_at(Selector::Head, true),
    );
    let (woven, outcomes) = weave(service(), &[directive], &Settings::new(), &handlers);
    assert!(outcomes[0].is_applied());

    let (result, machine) = run_compute(woven);
    assert_eq!(result, Ok(Some(Value::Int(3))));
    assert_eq!(machine.probes, 2);
    assert_eq!(machine.recorded, vec![Value::Int(3)]);
}

#[test]
fn plain_token_returns_default() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler("mods/ServiceHooks", "veto", &format!("(L{};)V", CANCELLABLE)),
        inject_at(Selector::Head, true),
    );
    let (woven, _) = weave(service(), &[directive], &Settings::new(), &handlers);

    let (result, machine) = run_compute(woven);
    assert_eq!(result, Ok(Some(Value::Int(0))));
    assert_eq!(machine.probes, 1);
}

#[test]
fn token_knows_when_cancelling_is_not_allowed() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler("mods/ServiceHooks", "veto", &format!("(L{};)V", CANCELLABLE)),
        inject_at(Selector::Head, false),
    );
    let (woven, outcomes) = weave(service(), &[directive], &Settings::new(), &handlers);
    assert!(outcomes[0].is_applied());

    let (result, _) = run_compute(woven);
    assert_eq!(
        result,
        Err(Trap::NotCancellable(String::from("app/Service.compute(II)I")))
    );
}

#[test]
fn every_return_of_a_constructor() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "<init>",
        handler("mods/ServiceHooks", "touch", "()V"),
        inject_at(Selector::TailOrReturn, false),
    );
    let (woven, outcomes) = weave(service(), &[directive], &Settings::new(), &handlers);
    assert!(outcomes[0].is_applied());

    let (result, machine) = run_compute(woven);
    assert_eq!(result, Ok(Some(Value::Int(3))));
    assert_eq!(machine.probes, 3);
}

#[test]
fn constructors_only_cancel_at_returns() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "<init>",
        handler("mods/ServiceHooks", "veto", &format!("(L{};)V", CANCELLABLE)),
        inject_at(Selector::Head, true),
    );
    let original = service();
    let (woven, outcomes) = weave(original.clone(), &[directive], &Settings::new(), &handlers);
    assert!(matches!(
        outcomes[0].status,
        WeaveStatus::Failed(Error::UnsupportedSelector(_))
    ));
    assert_eq!(woven.listing(), original.listing());
}

#[test]
fn handlers_take_at_most_one_token() {
    let handlers: HandlerLibrary = vec![hooks()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler(
            "mods/ServiceHooks",
            "twoTokens",
            &format!("(L{};L{};)V", CANCELLABLE, RETURNABLE),
        ),
        inject_at(Selector::Head, true),
    );
    let (woven, outcomes) = weave(service(), &[directive], &Settings::new(), &handlers);
    assert!(matches!(
        outcomes[0].status,
        WeaveStatus::Skipped(Error::TypeMismatch(_))
    ));

    let (result, _) = run_compute(woven);
    assert_eq!(result, Ok(Some(Value::Int(3))));
}

#[test]
fn relocated_runtime_classes() {
    let settings = Settings::with_runtime_package("shaded/rt").unwrap();
    let token = "shaded/rt/CancellationToken";
    let hooks = class(
        "mods/ServiceHooks",
        vec![method(
            "veto",
            &format!("(L{};)V", token),
            STATIC,
            vec![
                Instruction::LoadLocal(0, ValueKind::Reference),
                invoke_virtual(token, "cancel", "()V"),
                Instruction::Return(None),
            ],
        )],
    );
    let handlers: HandlerLibrary = vec![hooks.clone()].into_iter().collect();
    let directive = directive(
        "app/Service",
        "compute",
        handler("mods/ServiceHooks", "veto", &format!("(L{};)V", token)),
        inject_at(Selector::Head, true),
    );
    let (woven, outcomes) = weave(service(), &[directive], &settings, &handlers);
    assert!(outcomes[0].is_applied());
    assert!(woven.listing().contains("new shaded/rt/CancellationToken"));

    let mut machine = Machine::new(vec![woven, hooks]).with_settings(settings);
    let result = machine.call_virtual("app/Service", "compute", "(II)I", &[Value::Int(1), Value::Int(2)]);
    assert_eq!(result, Ok(Some(Value::Int(0))));
}
