//! Infrastructure adapters for drydock.
//!
//! This crate implements the ports defined in `drydock-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod application_loader;
pub mod builtin_definitions;
pub mod definition_loader;
pub mod repository;
pub mod revision_store;

// Re-export commonly used adapters
pub use application_loader::load_application;
pub use definition_loader::DefinitionLoader;
pub use repository::{
    CachedDefinitionRepository, InMemoryDefinitionRepository, LocalDefinitionRepository,
};
pub use revision_store::{InMemoryRevisionStore, LocalRevisionStore};
