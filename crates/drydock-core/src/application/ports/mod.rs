//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `drydock-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `DefinitionRepository`: component/trait definition lookup
//!   - `RevisionStore`: applied revisions for live-diff
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{DefinitionRepository, RevisionStore};

#[cfg(test)]
pub use output::{MockDefinitionRepository, MockRevisionStore};
