use super::{
    ConstantMatch, Directive, DirectiveKind, Error, HandlerReference, InjectionPoint, LocalAccess,
    MatchMode, MethodSelector, Placement, Selector, Settings, TargetPattern,
};
use crate::bytecode::code::Constant;
use crate::bytecode::{BinaryName, Name, ParseDescriptor, Signature, UnqualifiedName, ValueKind};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Directive as written in a directive file
///
/// ```json
/// { "kind": "Inject",
///   "targetClass": "com/example/Service",
///   "targetMethod": { "name": "compute", "descriptor": "(II)I" },
///   "handler": { "ownerType": "mods/Hooks", "name": "onCompute",
///                "descriptor": "(Lweaver/runtime/ReturnableToken;)V" },
///   "selector": { "keyword": "HEAD" },
///   "cancellable": true }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveRecord {
    pub kind: DirectiveMode,
    pub target_class: String,
    pub target_method: TargetMethodRecord,
    pub handler: HandlerRecord,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub selector: Option<SelectorRecord>,
    #[serde(default)]
    pub cancellable: bool,
    #[serde(default)]
    pub arg_index: Option<usize>,
    #[serde(default)]
    pub constant_match: Option<ConstantRecord>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveMode {
    Inject,
    Redirect,
    ModifyConstant,
    ModifyArg,
    ModifyArgs,
    ModifyVariable,
    Overwrite,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMethodRecord {
    pub name: String,
    #[serde(default)]
    pub descriptor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRecord {
    pub owner_type: String,
    pub name: String,
    pub descriptor: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Keyword {
    Head,
    Tail,
    Return,
    Invoke,
    Field,
    New,
    Store,
    Load,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRecord {
    pub keyword: Keyword,
    #[serde(default)]
    pub target_pattern: Option<String>,
    #[serde(default)]
    pub ordinal: Option<i32>,
    #[serde(default)]
    pub shift: Option<i32>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default, rename = "match")]
    pub match_mode: Option<MatchMode>,
    #[serde(default)]
    pub slot: Option<u16>,
    #[serde(default)]
    pub kind: Option<ValueKind>,
}

/// Typed literal (eg. `{ "type": "double", "value": 0.5 }` or `{ "type": "null" }`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ConstantRecord {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl From<ConstantRecord> for Constant {
    fn from(record: ConstantRecord) -> Constant {
        match record {
            ConstantRecord::Null => Constant::Null,
            ConstantRecord::Int(i) => Constant::Int(i),
            ConstantRecord::Long(l) => Constant::Long(l),
            ConstantRecord::Float(f) => Constant::Float(f),
            ConstantRecord::Double(d) => Constant::Double(d),
            ConstantRecord::String(s) => Constant::String(s),
        }
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedDirective(msg.into())
}

fn make_name<N: Name>(name: &str) -> Result<N, Error> {
    N::from_string(name.to_owned()).map_err(Error::MalformedDirective)
}

fn make_signature(descriptor: &str) -> Result<Signature, Error> {
    Signature::parse(descriptor)
        .map_err(|err| malformed(format!("bad descriptor '{}': {}", descriptor, err)))
}

impl SelectorRecord {
    fn injection_point(&self) -> Result<InjectionPoint, Error> {
        let ordinal = self.ordinal.unwrap_or(-1);
        let target = || -> Result<TargetPattern, Error> {
            let text = self
                .target_pattern
                .clone()
                .ok_or_else(|| malformed(format!("{:?} needs a target pattern", self.keyword)))?;
            Ok(TargetPattern {
                text,
                mode: self.match_mode.unwrap_or_default(),
            })
        };
        let selector = match self.keyword {
            Keyword::Head => Selector::Head,
            Keyword::Tail | Keyword::Return => Selector::TailOrReturn,
            Keyword::Invoke => Selector::BeforeCall {
                target: target()?,
                ordinal,
            },
            Keyword::Field => Selector::BeforeFieldAccess {
                target: target()?,
                ordinal,
            },
            Keyword::New => Selector::BeforeNew {
                target: target()?,
                ordinal,
            },
            Keyword::Store | Keyword::Load => Selector::AtStoreOrLoad {
                access: if self.keyword == Keyword::Store {
                    LocalAccess::Store
                } else {
                    LocalAccess::Load
                },
                slot: self.slot,
                kind: self.kind,
                ordinal,
            },
        };
        Ok(InjectionPoint {
            selector,
            shift: self.shift.unwrap_or(0),
            placement: self.placement.unwrap_or_default(),
        })
    }
}

impl DirectiveRecord {
    fn injection_point(&self) -> Result<InjectionPoint, Error> {
        self.selector
            .as_ref()
            .ok_or_else(|| malformed(format!("{:?} directives need a selector", self.kind)))?
            .injection_point()
    }

    /// Validate the record, filling in defaults from the settings
    pub fn into_directive(self, settings: &Settings) -> Result<Directive, Error> {
        let kind = match self.kind {
            DirectiveMode::Inject => DirectiveKind::Inject {
                at: self.injection_point()?,
                cancellable: self.cancellable,
            },
            DirectiveMode::Redirect => DirectiveKind::Redirect {
                at: self.injection_point()?,
            },
            DirectiveMode::ModifyConstant => {
                let value = self
                    .constant_match
                    .clone()
                    .ok_or_else(|| malformed("ModifyConstant directives need a constant match"))?;
                let ordinal = self
                    .selector
                    .as_ref()
                    .and_then(|selector| selector.ordinal)
                    .unwrap_or(-1);
                DirectiveKind::ModifyConstant {
                    constant: ConstantMatch {
                        value: Constant::from(value),
                        ordinal,
                    },
                }
            }
            DirectiveMode::ModifyArg => DirectiveKind::ModifyArg {
                at: self.injection_point()?,
                index: self.arg_index,
            },
            DirectiveMode::ModifyArgs => DirectiveKind::ModifyArgs {
                at: self.injection_point()?,
            },
            DirectiveMode::ModifyVariable => {
                let at = self.injection_point()?;
                let slot = self.selector.as_ref().and_then(|selector| selector.slot);
                let is_local = matches!(at.selector, Selector::AtStoreOrLoad { .. });
                if slot.is_none() && !is_local {
                    return Err(malformed(
                        "ModifyVariable directives need a slot unless they select a STORE or LOAD",
                    ));
                }
                DirectiveKind::ModifyVariable { at, slot }
            }
            DirectiveMode::Overwrite => DirectiveKind::Overwrite,
        };

        Ok(Directive {
            target_class: make_name::<BinaryName>(&self.target_class)?,
            target: MethodSelector {
                name: make_name::<UnqualifiedName>(&self.target_method.name)?,
                descriptor: self
                    .target_method
                    .descriptor
                    .as_deref()
                    .map(make_signature)
                    .transpose()?,
            },
            handler: HandlerReference {
                owner: make_name::<BinaryName>(&self.handler.owner_type)?,
                name: make_name::<UnqualifiedName>(&self.handler.name)?,
                descriptor: make_signature(&self.handler.descriptor)?,
            },
            priority: self.priority.unwrap_or(settings.default_priority),
            required: self.required,
            kind,
        })
    }
}

impl TryFrom<DirectiveRecord> for Directive {
    type Error = Error;

    fn try_from(record: DirectiveRecord) -> Result<Directive, Error> {
        record.into_directive(&Settings::new())
    }
}
