use super::args::{plan_modify_arg, plan_modify_args};
use super::constant::plan_modify_constant;
use super::inject::plan_inject;
use super::overwrite::plan_overwrite;
use super::redirect::plan_redirect;
use super::variable::plan_modify_variable;
use super::{
    Directive, DirectiveKind, DirectiveRegistry, Error, HandlerProvider, ResolvedHandler, Settings,
};
use crate::bytecode;
use crate::bytecode::code::{check_labels, compute_max_locals, simulate};
use crate::bytecode::model::{ClassDefinition, MethodBody};
use crate::bytecode::BinaryName;
use log::{error, info, warn};
use std::cmp::Reverse;

/// Everything a weaving mode needs to know besides the method it edits
pub struct WeaveContext<'a> {
    pub settings: &'a Settings,
    pub class_name: &'a BinaryName,
    pub directive: &'a Directive,
    pub handler: ResolvedHandler<'a>,
}

#[derive(Debug)]
pub enum WeaveStatus {
    Applied,

    /// The directive did not apply, but nothing is wrong with the class or the engine
    Skipped(Error),

    Failed(Error),
}

/// What happened to one directive
#[derive(Debug)]
pub struct WeaveOutcome {
    /// Position of the directive in the list passed to the weaver
    pub index: usize,

    /// Description of the directive
    pub directive: String,

    /// Methods the directive was woven into
    pub methods: Vec<String>,

    /// Number of injection points affected
    pub points: usize,

    pub status: WeaveStatus,
}

impl WeaveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self.status, WeaveStatus::Applied)
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.status {
            WeaveStatus::Applied => None,
            WeaveStatus::Skipped(err) | WeaveStatus::Failed(err) => Some(err),
        }
    }
}

/// Applies directives to classes
///
/// A weaver only reads its settings and handlers, so one weaver can be shared by threads
/// weaving different classes.
pub struct Weaver<'a, H: ?Sized> {
    pub settings: &'a Settings,
    pub handlers: &'a H,
}

impl<'a, H: HandlerProvider + ?Sized> Weaver<'a, H> {
    pub fn new(settings: &'a Settings, handlers: &'a H) -> Weaver<'a, H> {
        Weaver { settings, handlers }
    }

    /// Weave the directives registered for this class
    pub fn weave_registered(
        &self,
        class: &mut ClassDefinition,
        registry: &DirectiveRegistry,
    ) -> Vec<WeaveOutcome> {
        let directives = registry.directives_for(&class.name);
        self.weave(class, directives)
    }

    /// Weave directives into a class, highest priority first
    ///
    /// Directives are applied one at a time: one that fails leaves the class exactly as it was
    /// before that directive, and the rest still get applied. The class is marked as woven
    /// afterwards, and weaving it again changes nothing.
    pub fn weave(&self, class: &mut ClassDefinition, directives: &[Directive]) -> Vec<WeaveOutcome> {
        if class.is_woven() {
            error!(
                "{} has already been woven, ignoring {} directive(s)",
                class.name,
                directives.len()
            );
            return directives
                .iter()
                .enumerate()
                .map(|(index, directive)| WeaveOutcome {
                    index,
                    directive: directive.to_string(),
                    methods: vec![],
                    points: 0,
                    status: WeaveStatus::Failed(Error::AlreadyWoven(class.name.clone())),
                })
                .collect();
        }

        // Stable, so equal priorities keep their order
        let mut order: Vec<usize> = (0..directives.len()).collect();
        order.sort_by_key(|&index| Reverse(directives[index].priority));

        let outcomes = order
            .into_iter()
            .map(|index| self.weave_directive(class, index, &directives[index]))
            .collect();
        class.mark_woven();
        outcomes
    }

    fn weave_directive(
        &self,
        class: &mut ClassDefinition,
        index: usize,
        directive: &Directive,
    ) -> WeaveOutcome {
        let mut methods = vec![];
        let result = self.try_weave_directive(class, directive, &mut methods);
        let status = match result {
            Ok(points) => {
                info!(
                    "{}: applied {} at {} point(s) in {}",
                    class.name,
                    directive,
                    points,
                    methods.join(", ")
                );
                return WeaveOutcome {
                    index,
                    directive: directive.to_string(),
                    methods,
                    points,
                    status: WeaveStatus::Applied,
                };
            }
            Err(err @ (Error::NoMatchFound(_) | Error::TargetMethodNotFound(_)))
                if !directive.required =>
            {
                warn!("{}: skipped {}: {}", class.name, directive, err);
                WeaveStatus::Skipped(err)
            }
            Err(
                err @ (Error::TypeMismatch(_)
                | Error::HandlerUnresolved(_)
                | Error::TargetClassMismatch { .. }),
            ) => {
                warn!("{}: skipped {}: {}", class.name, directive, err);
                WeaveStatus::Skipped(err)
            }
            Err(err) => {
                error!("{}: failed {}: {}", class.name, directive, err);
                WeaveStatus::Failed(err)
            }
        };
        WeaveOutcome {
            index,
            directive: directive.to_string(),
            methods: vec![],
            points: 0,
            status,
        }
    }

    /// Weave into every matching method, or into none of them
    fn try_weave_directive(
        &self,
        class: &mut ClassDefinition,
        directive: &Directive,
        methods: &mut Vec<String>,
    ) -> Result<usize, Error> {
        if directive.target_class != class.name {
            return Err(Error::TargetClassMismatch {
                expected: directive.target_class.clone(),
                found: class.name.clone(),
            });
        }
        let targets: Vec<usize> = class
            .methods
            .iter()
            .enumerate()
            .filter(|(_, method)| directive.target.matches(method))
            .map(|(index, _)| index)
            .collect();
        if targets.is_empty() {
            return Err(Error::TargetMethodNotFound(format!(
                "{}.{}",
                class.name, directive.target
            )));
        }
        let handler = self
            .handlers
            .resolve_handler(&directive.handler)
            .ok_or_else(|| Error::HandlerUnresolved(directive.handler.to_string()))?;

        let cx = WeaveContext {
            settings: self.settings,
            class_name: &class.name,
            directive,
            handler: ResolvedHandler {
                reference: &directive.handler,
                body: handler,
            },
        };
        let snapshots: Vec<MethodBody> = targets
            .iter()
            .map(|&index| class.methods[index].clone())
            .collect();

        let mut points = 0;
        let mut unmatched = None;
        let mut failure = None;
        for &index in &targets {
            let method = &mut class.methods[index];
            match self.weave_method(&cx, method) {
                Ok(count) => {
                    points += count;
                    methods.push(method.identity());
                }
                Err(err @ Error::NoMatchFound(_)) => unmatched = Some(err),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let failure = match (failure, unmatched) {
            (Some(err), _) => Some(err),
            (None, Some(err)) if points == 0 => Some(err),
            _ => None,
        };
        match failure {
            None => Ok(points),
            Some(err) => {
                for (&index, snapshot) in targets.iter().zip(snapshots) {
                    class.methods[index] = snapshot;
                }
                methods.clear();
                Err(err)
            }
        }
    }

    /// Weave into one method, then check what came out
    fn weave_method(&self, cx: &WeaveContext, method: &mut MethodBody) -> Result<usize, Error> {
        // Only verify methods that could be verified to begin with
        let verifiable = simulate(&method.instructions).is_ok();

        let plan = match &cx.directive.kind {
            DirectiveKind::Inject { at, cancellable } => plan_inject(cx, method, at, *cancellable)?,
            DirectiveKind::Redirect { at } => plan_redirect(cx, method, at)?,
            DirectiveKind::ModifyConstant { constant } => plan_modify_constant(cx, method, constant)?,
            DirectiveKind::ModifyArg { at, index } => plan_modify_arg(cx, method, at, *index)?,
            DirectiveKind::ModifyArgs { at } => plan_modify_args(cx, method, at)?,
            DirectiveKind::ModifyVariable { at, slot } => {
                plan_modify_variable(cx, method, at, *slot)?
            }
            DirectiveKind::Overwrite => plan_overwrite(cx, method)?,
        };
        let points = plan.apply(method)?;

        check_labels(&method.instructions).map_err(bytecode::Error::from)?;
        if self.settings.verify_after_weave && verifiable {
            let summary = simulate(&method.instructions).map_err(bytecode::Error::from)?;
            method.max_stack = u16::try_from(summary.max_stack)
                .map_err(|_| bytecode::Error::MaxStackOverflow(summary.max_stack))?;
        }
        let max_locals = compute_max_locals(&method.instructions, method.parameter_length());
        if max_locals > u16::MAX as usize {
            return Err(Error::LocalsOverflow);
        }
        method.max_locals = method.max_locals.max(max_locals as u16);
        Ok(points)
    }
}

/// Weave directives into a class, returning the class along with what happened to each directive
///
/// This never fails: at worst, none of the directives take effect.
pub fn weave<H: HandlerProvider + ?Sized>(
    mut class: ClassDefinition,
    directives: &[Directive],
    settings: &Settings,
    handlers: &H,
) -> (ClassDefinition, Vec<WeaveOutcome>) {
    let outcomes = Weaver::new(settings, handlers).weave(&mut class, directives);
    (class, outcomes)
}
