//! In-memory definition repository with built-in definitions.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use drydock_core::{
    application::{ApplicationError, ports::DefinitionRepository},
    domain::{
        ComponentDefinition, Definition, DefinitionKind, DomainValidator as validator,
        TraitDefinition,
    },
    error::DrydockResult,
};

use super::{as_component, as_trait, resolve};
use crate::builtin_definitions;

type Key = (DefinitionKind, String, String);

/// Thread-safe in-memory definition repository.
///
/// Inserting a definition with the same kind, namespace and name replaces
/// the previous one.
#[derive(Clone)]
pub struct InMemoryDefinitionRepository {
    inner: Arc<RwLock<HashMap<Key, Definition>>>,
}

impl InMemoryDefinitionRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a repository with built-in definitions loaded.
    pub fn with_builtin() -> DrydockResult<Self> {
        let repository = Self::new();
        repository.extend(builtin_definitions::all_definitions()?)?;
        Ok(repository)
    }

    /// Validate and insert one definition.
    pub fn insert(&self, definition: Definition) -> DrydockResult<()> {
        validator::validate_definition(&definition)?;
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        inner.insert(key(&definition), definition);
        Ok(())
    }

    pub fn extend(&self, definitions: impl IntoIterator<Item = Definition>) -> DrydockResult<()> {
        for definition in definitions {
            self.insert(definition)?;
        }
        Ok(())
    }

    /// Get the number of definitions.
    pub fn len(&self) -> usize {
        self.inner.read().map_or(0, |inner| inner.len())
    }

    /// Check if the repository is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(
        &self,
        kind: DefinitionKind,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<Definition>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(resolve(inner.values(), kind, name, namespace).cloned())
    }
}

impl Default for InMemoryDefinitionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRepository for InMemoryDefinitionRepository {
    fn component_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<ComponentDefinition>> {
        Ok(self
            .lookup(DefinitionKind::Component, name, namespace)?
            .as_ref()
            .and_then(as_component))
    }

    fn trait_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<TraitDefinition>> {
        Ok(self
            .lookup(DefinitionKind::Trait, name, namespace)?
            .as_ref()
            .and_then(as_trait))
    }

    fn list(&self) -> DrydockResult<Vec<Definition>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner.values().cloned().collect())
    }
}

fn key(definition: &Definition) -> Key {
    (
        definition.kind(),
        definition.namespace().to_string(),
        definition.name().to_string(),
    )
}
