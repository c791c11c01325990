use super::{Directive, DirectiveRecord, Error, Settings};
use crate::bytecode::BinaryName;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::Read;

/// Collects directives in discovery order
#[derive(Default, Debug)]
pub struct RegistryBuilder {
    directives: Vec<Directive>,
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn add(&mut self, directive: Directive) -> &mut Self {
        self.directives.push(directive);
        self
    }

    /// Freeze into a registry, with each class's directives in weaving order
    pub fn build(self) -> DirectiveRegistry {
        let mut by_class: HashMap<BinaryName, Vec<Directive>> = HashMap::new();
        for directive in self.directives {
            by_class
                .entry(directive.target_class.clone())
                .or_default()
                .push(directive);
        }
        for directives in by_class.values_mut() {
            directives.sort_by_key(|directive| Reverse(directive.priority));
        }
        DirectiveRegistry { by_class }
    }
}

/// Immutable map from target class to the directives woven into it
///
/// Built once before any weaving, then shared (it is `Send + Sync`) by however many threads are
/// weaving classes.
#[derive(Default, Debug)]
pub struct DirectiveRegistry {
    by_class: HashMap<BinaryName, Vec<Directive>>,
}

impl DirectiveRegistry {
    /// Build a registry from directive records, in the order given
    pub fn from_records(
        records: impl IntoIterator<Item = DirectiveRecord>,
        settings: &Settings,
    ) -> Result<DirectiveRegistry, Error> {
        let mut builder = RegistryBuilder::new();
        for record in records {
            builder.add(record.into_directive(settings)?);
        }
        Ok(builder.build())
    }

    /// Build a registry from a JSON array of directive records
    pub fn from_json(reader: impl Read, settings: &Settings) -> Result<DirectiveRegistry, Error> {
        let records: Vec<DirectiveRecord> = serde_json::from_reader(reader)?;
        DirectiveRegistry::from_records(records, settings)
    }

    /// Directives for a class, highest priority first
    pub fn directives_for(&self, class: &BinaryName) -> &[Directive] {
        self.by_class.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Classes that have directives
    pub fn classes(&self) -> impl Iterator<Item = &BinaryName> {
        self.by_class.keys()
    }

    /// Total number of directives
    pub fn len(&self) -> usize {
        self.by_class.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}
