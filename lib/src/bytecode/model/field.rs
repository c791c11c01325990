use crate::bytecode::{FieldAccessFlags, UnqualifiedName, ValueType};
use serde::{Deserialize, Serialize};

/// Field declared on a class
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: UnqualifiedName,
    pub descriptor: ValueType,
    #[serde(default)]
    pub access_flags: FieldAccessFlags,
}

impl FieldDeclaration {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }
}
