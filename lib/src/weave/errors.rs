use crate::bytecode;
use crate::bytecode::BinaryName;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The selector matched no instruction in the target method
    NoMatchFound(String),

    /// The selector cannot be used with this kind of directive or at this anchor
    UnsupportedSelector(String),

    /// Handler signature incompatible with the values at the injection point
    TypeMismatch(String),

    /// The handler method could not be found
    HandlerUnresolved(String),

    /// Something the engine relies on does not hold (indicates a bug)
    InternalInvariantViolation(bytecode::Error),

    /// No method in the class matches the directive's method selector
    TargetMethodNotFound(String),

    /// The directive was registered for some other class
    TargetClassMismatch {
        expected: BinaryName,
        found: BinaryName,
    },

    /// The class has already been through the weaver
    AlreadyWoven(BinaryName),

    /// Woven code would need more locals than a method can have
    LocalsOverflow,

    /// Directive record could not be turned into a directive
    MalformedDirective(String),

    MalformedName(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl From<bytecode::Error> for Error {
    fn from(err: bytecode::Error) -> Error {
        Error::InternalInvariantViolation(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoMatchFound(selector) => write!(f, "no match found for {}", selector),
            Error::UnsupportedSelector(msg) => write!(f, "unsupported selector: {}", msg),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            Error::HandlerUnresolved(handler) => write!(f, "handler {} could not be resolved", handler),
            Error::InternalInvariantViolation(err) => write!(f, "internal invariant violated: {}", err),
            Error::TargetMethodNotFound(method) => write!(f, "no method matches {}", method),
            Error::TargetClassMismatch { expected, found } => {
                write!(f, "directive targets {} but was given {}", expected, found)
            }
            Error::AlreadyWoven(class) => write!(f, "class {} has already been woven", class),
            Error::LocalsOverflow => write!(f, "too many locals"),
            Error::MalformedDirective(msg) => write!(f, "malformed directive: {}", msg),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::Io(err) => write!(f, "{}", err),
            Error::Json(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}
