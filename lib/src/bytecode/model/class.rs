use crate::bytecode::model::{FieldDeclaration, MethodBody};
use crate::bytecode::{BinaryName, Error, Signature, UnqualifiedName};
use serde::{Deserialize, Serialize};

/// Class whose methods can be woven
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub name: BinaryName,

    #[serde(default = "default_super_name")]
    pub super_name: BinaryName,

    /// Fields
    ///
    /// Use [`Self::add_field`] to keep names unique
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,

    /// Methods
    ///
    /// Use [`Self::add_method`] to keep name and descriptor pairs unique
    #[serde(default)]
    pub methods: Vec<MethodBody>,

    /// Set once the weaver has processed the class
    #[serde(default)]
    woven: bool,
}

fn default_super_name() -> BinaryName {
    BinaryName::OBJECT
}

impl ClassDefinition {
    /// Create a new empty class extending `java/lang/Object`
    pub fn new(name: BinaryName) -> ClassDefinition {
        ClassDefinition {
            name,
            super_name: BinaryName::OBJECT,
            fields: vec![],
            methods: vec![],
            woven: false,
        }
    }

    pub fn add_field(&mut self, field: FieldDeclaration) -> Result<(), Error> {
        if self.fields.iter().any(|existing| existing.name == field.name) {
            return Err(Error::DuplicateField(self.name.clone(), field.name));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn add_method(&mut self, method: MethodBody) -> Result<(), Error> {
        if self.method(&method.name, &method.descriptor).is_some() {
            return Err(Error::DuplicateMethod(self.name.clone(), method.identity()));
        }
        self.methods.push(method);
        Ok(())
    }

    pub fn method(&self, name: &UnqualifiedName, descriptor: &Signature) -> Option<&MethodBody> {
        self.methods
            .iter()
            .find(|method| &method.name == name && &method.descriptor == descriptor)
    }

    /// Check that no two members collide (useful on classes that were deserialized)
    pub fn check_members(&self) -> Result<(), Error> {
        for (index, method) in self.methods.iter().enumerate() {
            let duplicate = self.methods[..index]
                .iter()
                .any(|other| other.name == method.name && other.descriptor == method.descriptor);
            if duplicate {
                return Err(Error::DuplicateMethod(self.name.clone(), method.identity()));
            }
        }
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|other| other.name == field.name) {
                return Err(Error::DuplicateField(self.name.clone(), field.name.clone()));
            }
        }
        Ok(())
    }

    /// Recompute the stack and locals bounds of every method
    pub fn recompute_bounds(&mut self) -> Result<(), Error> {
        self.methods
            .iter_mut()
            .try_for_each(|method| method.recompute_bounds())
    }

    /// Has this class already been through the weaver?
    pub fn is_woven(&self) -> bool {
        self.woven
    }

    pub fn mark_woven(&mut self) {
        self.woven = true;
    }

    /// Listing of every method in the class
    pub fn listing(&self) -> String {
        let mut out = format!("class {} extends {}\n", self.name, self.super_name);
        for method in &self.methods {
            out.push('\n');
            out.push_str(&method.listing());
        }
        out
    }
}
