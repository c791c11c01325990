use super::HandlerReference;
use crate::bytecode::code::Constant;
use crate::bytecode::model::MethodBody;
use crate::bytecode::{BinaryName, RenderDescriptor, Signature, UnqualifiedName, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which methods of the target class a directive applies to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSelector {
    pub name: UnqualifiedName,

    /// When missing, every overload with the name matches
    #[serde(default)]
    pub descriptor: Option<Signature>,
}

impl MethodSelector {
    pub fn matches(&self, method: &MethodBody) -> bool {
        self.name == method.name
            && self
                .descriptor
                .as_ref()
                .map_or(true, |descriptor| descriptor == &method.descriptor)
    }
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.descriptor {
            Some(descriptor) => write!(f, "{}{}", self.name, descriptor.render()),
            None => write!(f, "{}", self.name),
        }
    }
}

/// How a target pattern is compared against an instruction's identity
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    /// Equal, or either one contains the other
    Permissive,

    /// Equal
    Exact,

    /// The identity contains the pattern
    Contains,
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Permissive
    }
}

/// Pattern for calls (`owner.name` + descriptor), field accesses (`owner.name:descriptor`) or
/// allocations (class name)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPattern {
    pub text: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl TargetPattern {
    pub fn new(text: impl Into<String>) -> TargetPattern {
        TargetPattern {
            text: text.into(),
            mode: MatchMode::Permissive,
        }
    }

    pub fn exact(text: impl Into<String>) -> TargetPattern {
        TargetPattern {
            text: text.into(),
            mode: MatchMode::Exact,
        }
    }

    pub fn matches(&self, identity: &str) -> bool {
        match self.mode {
            MatchMode::Exact => identity == self.text,
            MatchMode::Contains => identity.contains(self.text.as_str()),
            MatchMode::Permissive => {
                identity == self.text
                    || identity.contains(self.text.as_str())
                    || self.text.contains(identity)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocalAccess {
    Store,
    Load,
}

/// Which instructions in a method are injection points
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// The first instruction
    Head,

    /// Every return
    TailOrReturn,

    BeforeCall {
        target: TargetPattern,
        ordinal: i32,
    },

    BeforeFieldAccess {
        target: TargetPattern,
        ordinal: i32,
    },

    BeforeNew {
        target: TargetPattern,
        ordinal: i32,
    },

    /// Stores to or loads from locals, optionally only of one slot or kind
    AtStoreOrLoad {
        access: LocalAccess,
        slot: Option<u16>,
        kind: Option<ValueKind>,
        ordinal: i32,
    },
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Head => write!(f, "HEAD"),
            Selector::TailOrReturn => write!(f, "RETURN"),
            Selector::BeforeCall { target, ordinal } => {
                write!(f, "INVOKE '{}' #{}", target.text, ordinal)
            }
            Selector::BeforeFieldAccess { target, ordinal } => {
                write!(f, "FIELD '{}' #{}", target.text, ordinal)
            }
            Selector::BeforeNew { target, ordinal } => {
                write!(f, "NEW '{}' #{}", target.text, ordinal)
            }
            Selector::AtStoreOrLoad {
                access,
                slot,
                ordinal,
                ..
            } => {
                match access {
                    LocalAccess::Store => write!(f, "STORE")?,
                    LocalAccess::Load => write!(f, "LOAD")?,
                };
                if let Some(slot) = slot {
                    write!(f, " {}", slot)?;
                }
                write!(f, " #{}", ordinal)
            }
        }
    }
}

/// Which side of the anchor woven code goes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placement {
    Before,
    After,
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Before
    }
}

/// Selector along with how to move off the matched instructions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionPoint {
    pub selector: Selector,

    /// Walk each match this many instructions forward (or backward when negative)
    #[serde(default)]
    pub shift: i32,

    #[serde(default)]
    pub placement: Placement,
}

impl InjectionPoint {
    pub fn new(selector: Selector) -> InjectionPoint {
        InjectionPoint {
            selector,
            shift: 0,
            placement: Placement::Before,
        }
    }

    pub fn with_shift(mut self, shift: i32) -> InjectionPoint {
        self.shift = shift;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> InjectionPoint {
        self.placement = placement;
        self
    }
}

/// Literal pushes that a constant directive rewrites
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantMatch {
    pub value: Constant,

    /// Zero-based index among the matching pushes, or -1 for all of them
    #[serde(default = "all_ordinals")]
    pub ordinal: i32,
}

fn all_ordinals() -> i32 {
    -1
}

/// What a directive does at its injection points
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// Call the handler, optionally letting it cancel the method
    Inject { at: InjectionPoint, cancellable: bool },

    /// Replace a call or field access with a call to the handler
    Redirect { at: InjectionPoint },

    /// Pass a literal through the handler
    ModifyConstant { constant: ConstantMatch },

    /// Pass one argument of a call through the handler (`None` to infer which from types)
    ModifyArg {
        at: InjectionPoint,
        index: Option<usize>,
    },

    /// Let the handler edit all arguments of a call through an argument view
    ModifyArgs { at: InjectionPoint },

    /// Pass a local variable through the handler
    ///
    /// `slot` is only needed when the anchor is not itself a store or load.
    ModifyVariable { at: InjectionPoint, slot: Option<u16> },

    /// Replace the method body with the handler's body
    Overwrite,
}

impl DirectiveKind {
    pub fn mode_name(&self) -> &'static str {
        match self {
            DirectiveKind::Inject { .. } => "Inject",
            DirectiveKind::Redirect { .. } => "Redirect",
            DirectiveKind::ModifyConstant { .. } => "ModifyConstant",
            DirectiveKind::ModifyArg { .. } => "ModifyArg",
            DirectiveKind::ModifyArgs { .. } => "ModifyArgs",
            DirectiveKind::ModifyVariable { .. } => "ModifyVariable",
            DirectiveKind::Overwrite => "Overwrite",
        }
    }
}

/// One weaving instruction, as registered against a class
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub target_class: BinaryName,
    pub target: MethodSelector,
    pub handler: HandlerReference,

    /// Higher priorities are woven first
    pub priority: i32,

    /// Report zero matches as a failure instead of a skip
    #[serde(default)]
    pub required: bool,

    pub kind: DirectiveKind,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} -> {}",
            self.kind.mode_name(),
            self.target_class,
            self.target,
            self.handler
        )
    }
}
