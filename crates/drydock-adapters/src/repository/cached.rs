//! Memoizing repository wrapper.

use std::{collections::HashMap, sync::Mutex};

use drydock_core::{
    application::{ApplicationError, ports::DefinitionRepository},
    domain::{ComponentDefinition, Definition, TraitDefinition},
    error::DrydockResult,
};

type Lookup = (String, String);

/// Remembers every lookup of the wrapped repository, misses included.
///
/// Definitions are read once per process: changes on disk after the first
/// lookup of a name are not observed.
pub struct CachedDefinitionRepository<R> {
    inner: R,
    components: Mutex<HashMap<Lookup, Option<ComponentDefinition>>>,
    traits: Mutex<HashMap<Lookup, Option<TraitDefinition>>>,
    listing: Mutex<Option<Vec<Definition>>>,
}

impl<R: DefinitionRepository> CachedDefinitionRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            components: Mutex::new(HashMap::new()),
            traits: Mutex::new(HashMap::new()),
            listing: Mutex::new(None),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Look `key` up in `cache`, filling it from `load` on a miss.
fn memoized<T: Clone>(
    cache: &Mutex<HashMap<Lookup, T>>,
    key: Lookup,
    load: impl FnOnce() -> DrydockResult<T>,
) -> DrydockResult<T> {
    if let Some(hit) = cache
        .lock()
        .map_err(|_| ApplicationError::StoreLockError)?
        .get(&key)
    {
        return Ok(hit.clone());
    }
    let value = load()?;
    cache
        .lock()
        .map_err(|_| ApplicationError::StoreLockError)?
        .insert(key, value.clone());
    Ok(value)
}

impl<R: DefinitionRepository> DefinitionRepository for CachedDefinitionRepository<R> {
    fn component_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<ComponentDefinition>> {
        memoized(
            &self.components,
            (name.to_string(), namespace.to_string()),
            || self.inner.component_definition(name, namespace),
        )
    }

    fn trait_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<TraitDefinition>> {
        memoized(
            &self.traits,
            (name.to_string(), namespace.to_string()),
            || self.inner.trait_definition(name, namespace),
        )
    }

    fn list(&self) -> DrydockResult<Vec<Definition>> {
        let mut listing = self
            .listing
            .lock()
            .map_err(|_| ApplicationError::StoreLockError)?;
        if let Some(definitions) = listing.as_ref() {
            return Ok(definitions.clone());
        }
        let definitions = self.inner.list()?;
        *listing = Some(definitions.clone());
        Ok(definitions)
    }
}
