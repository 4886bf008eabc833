//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `drydock-adapters` crate provides implementations.

use crate::domain::{ComponentDefinition, Definition, Revision, TraitDefinition};
use crate::error::DrydockResult;

/// Port for definition lookup.
///
/// Implemented by:
/// - `drydock_adapters::repository::InMemoryDefinitionRepository` (built-ins, tests)
/// - `drydock_adapters::repository::LocalDefinitionRepository` (a directory of manifests)
/// - `drydock_adapters::repository::CachedDefinitionRepository` (memoizing wrapper)
///
/// ## Lookup semantics
///
/// Every implementation searches `namespace` first and then the system
/// namespace, and returns `Ok(None)` when neither has the name. Errors are
/// reserved for a source that could not be read.
#[cfg_attr(test, mockall::automock)]
pub trait DefinitionRepository: Send + Sync {
    /// Resolve a component type.
    fn component_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<ComponentDefinition>>;

    /// Resolve a trait type.
    fn trait_definition(&self, name: &str, namespace: &str)
    -> DrydockResult<Option<TraitDefinition>>;

    /// All definitions visible to this repository.
    fn list(&self) -> DrydockResult<Vec<Definition>>;
}

/// Port for applied revisions (the live-diff baseline).
///
/// Implemented by:
/// - `drydock_adapters::revision_store::InMemoryRevisionStore`
/// - `drydock_adapters::revision_store::LocalRevisionStore`
#[cfg_attr(test, mockall::automock)]
pub trait RevisionStore: Send + Sync {
    /// The highest-numbered revision of an application, if any.
    fn latest(&self, application: &str, namespace: &str) -> DrydockResult<Option<Revision>>;

    /// Persist a revision.
    fn record(&self, revision: &Revision) -> DrydockResult<()>;
}

impl<T: DefinitionRepository + ?Sized> DefinitionRepository for Box<T> {
    fn component_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<ComponentDefinition>> {
        (**self).component_definition(name, namespace)
    }

    fn trait_definition(
        &self,
        name: &str,
        namespace: &str,
    ) -> DrydockResult<Option<TraitDefinition>> {
        (**self).trait_definition(name, namespace)
    }

    fn list(&self) -> DrydockResult<Vec<Definition>> {
        (**self).list()
    }
}
