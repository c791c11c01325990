use super::code::{AnalysisError, InsnRef};
use super::{BinaryName, UnqualifiedName};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// An anchor was used on a stream that did not create it (indicates a bug)
    ForeignAnchor(InsnRef),

    /// An anchor refers to an instruction that has since been removed (indicates a bug)
    RemovedAnchor(InsnRef),

    DuplicateMethod(BinaryName, String),
    DuplicateField(BinaryName, UnqualifiedName),

    /// A descriptor string could not be parsed
    BadDescriptor(String, std::io::Error),

    MalformedName(String),

    /// Code fails the label or stack depth checks
    Analysis(AnalysisError),

    MaxStackOverflow(usize),
    MaxLocalsOverflow(usize),
}

impl From<AnalysisError> for Error {
    fn from(err: AnalysisError) -> Error {
        Error::Analysis(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ForeignAnchor(anchor) => write!(f, "anchor {:?} is not owned by this stream", anchor),
            Error::RemovedAnchor(anchor) => write!(f, "anchor {:?} was removed", anchor),
            Error::DuplicateMethod(class, method) => {
                write!(f, "method {} is already declared on {}", method, class)
            }
            Error::DuplicateField(class, field) => {
                write!(f, "field {} is already declared on {}", field, class)
            }
            Error::BadDescriptor(descriptor, err) => {
                write!(f, "bad descriptor '{}': {}", descriptor, err)
            }
            Error::MalformedName(msg) => f.write_str(msg),
            Error::Analysis(err) => write!(f, "invalid code: {}", err),
            Error::MaxStackOverflow(depth) => write!(f, "max stack {} does not fit in u16", depth),
            Error::MaxLocalsOverflow(locals) => {
                write!(f, "max locals {} does not fit in u16", locals)
            }
        }
    }
}

impl std::error::Error for Error {}
