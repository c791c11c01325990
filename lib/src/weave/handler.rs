use crate::bytecode::code::{Instruction, InvokeKind, MethodRef};
use crate::bytecode::model::{ClassDefinition, MethodBody};
use crate::bytecode::{BinaryName, RenderDescriptor, Signature, UnqualifiedName, ValueType};
use crate::util::Width;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handler method named by a directive
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerReference {
    #[serde(rename = "ownerType")]
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: Signature,
}

impl fmt::Display for HandlerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor.render())
    }
}

/// Source of compiled handler methods
///
/// The weaver only looks at handlers (to learn whether they are static, and for overwrites to
/// copy their body). It never runs them.
pub trait HandlerProvider {
    fn resolve_handler(&self, handler: &HandlerReference) -> Option<&MethodBody>;
}

/// Handler classes, indexed by name
#[derive(Default, Debug, Clone)]
pub struct HandlerLibrary {
    classes: HashMap<BinaryName, ClassDefinition>,
}

impl HandlerLibrary {
    pub fn new() -> HandlerLibrary {
        HandlerLibrary::default()
    }

    /// Add a class, returning the one it replaces (if any)
    pub fn add_class(&mut self, class: ClassDefinition) -> Option<ClassDefinition> {
        self.classes.insert(class.name.clone(), class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<ClassDefinition> for HandlerLibrary {
    fn from_iter<I: IntoIterator<Item = ClassDefinition>>(iter: I) -> Self {
        let mut library = HandlerLibrary::new();
        for class in iter {
            library.add_class(class);
        }
        library
    }
}

impl HandlerProvider for HandlerLibrary {
    fn resolve_handler(&self, handler: &HandlerReference) -> Option<&MethodBody> {
        self.classes
            .get(&handler.owner)?
            .method(&handler.name, &handler.descriptor)
    }
}

/// Handler that has been looked up, along with how to call it from woven code
#[derive(Copy, Clone)]
pub struct ResolvedHandler<'h> {
    pub reference: &'h HandlerReference,
    pub body: &'h MethodBody,
}

impl<'h> ResolvedHandler<'h> {
    pub fn is_static(&self) -> bool {
        self.body.is_static()
    }

    pub fn parameters(&self) -> &'h [ValueType] {
        &self.reference.descriptor.parameters
    }

    pub fn return_type(&self) -> Option<&'h ValueType> {
        self.reference.descriptor.return_type.as_ref()
    }

    pub fn method_ref(&self) -> MethodRef {
        MethodRef {
            owner: self.reference.owner.clone(),
            name: self.reference.name.clone(),
            descriptor: self.reference.descriptor.clone(),
        }
    }

    /// Construct a fresh handler instance (nothing for static handlers)
    pub fn emit_instance(&self, code: &mut Vec<Instruction>) {
        if !self.is_static() {
            code.push(Instruction::New(self.reference.owner.clone()));
            code.push(Instruction::Dup);
            code.push(Instruction::Invoke(
                InvokeKind::Special,
                MethodRef {
                    owner: self.reference.owner.clone(),
                    name: UnqualifiedName::INIT,
                    descriptor: Signature {
                        parameters: vec![],
                        return_type: None,
                    },
                },
            ));
        }
    }

    /// Call the handler, assuming the instance (if any) and arguments are on the stack
    pub fn emit_invoke(&self, code: &mut Vec<Instruction>) {
        let kind = if self.is_static() {
            InvokeKind::Static
        } else {
            InvokeKind::Virtual
        };
        code.push(Instruction::Invoke(kind, self.method_ref()));
    }

    /// Call the handler on the value at the top of the stack (of the given width)
    ///
    /// The handler instance has to go under the value: that is a `swap` for narrow values and
    /// `dup_x2; pop` for wide ones.
    pub fn emit_call_on_top(&self, code: &mut Vec<Instruction>, top: &ValueType) {
        if !self.is_static() {
            self.emit_instance(code);
            if top.width() == 2 {
                code.push(Instruction::DupX2);
                code.push(Instruction::Pop);
            } else {
                code.push(Instruction::Swap);
            }
        }
        self.emit_invoke(code);
    }
}
