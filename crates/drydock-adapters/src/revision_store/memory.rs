//! In-memory revision store.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use drydock_core::{
    application::{ApplicationError, ports::RevisionStore},
    domain::Revision,
    error::DrydockResult,
};

/// Thread-safe in-memory revision store, keyed by namespace and application.
#[derive(Clone, Default)]
pub struct InMemoryRevisionStore {
    inner: Arc<RwLock<HashMap<(String, String), Vec<Revision>>>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevisionStore for InMemoryRevisionStore {
    fn latest(&self, application: &str, namespace: &str) -> DrydockResult<Option<Revision>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?;
        Ok(inner
            .get(&(namespace.to_string(), application.to_string()))
            .and_then(|revisions| revisions.iter().max_by_key(|r| r.number))
            .cloned())
    }

    fn record(&self, revision: &Revision) -> DrydockResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?;
        let key = (
            revision.application.namespace().to_string(),
            revision.application.name().to_string(),
        );
        let revisions = inner.entry(key).or_default();
        if revisions.iter().any(|r| r.number == revision.number) {
            return Err(ApplicationError::RevisionStore {
                reason: format!("revision {} already exists", revision.name),
            }
            .into());
        }
        revisions.push(revision.clone());
        Ok(())
    }
}
