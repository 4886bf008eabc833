pub mod application;
pub mod context;
pub mod definition;
pub mod resource;
pub mod revision;

pub use crate::domain::DomainError;
pub use application::{
    ApplicationManifest, ApplicationSpec, ComponentSpec, DEFAULT_NAMESPACE, TraitSpec,
};
pub use context::RenderContext;
pub use definition::{
    ComponentDefinition, Definition, DefinitionKind, DefinitionSummary, SYSTEM_NAMESPACE,
    Schematic, StatusPolicy, TraitDefinition, WorkloadType,
};
pub use resource::{
    RenderedApplication, RenderedComponent, RenderedResource, ResourceIdentity, ResourceRole,
    labels,
};
pub use revision::{Revision, RevisionRecord};
