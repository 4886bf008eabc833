//! drydock Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for drydock: an
//! offline renderer and differ for component/trait applications.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           drydock-cli (CLI)             │
//! │   dry-run · live-diff · show · list     │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (RenderService, DiffService, Show...)   │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (DefinitionRepository, RevisionStore)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     drydock-adapters (Infrastructure)   │
//! │ (in-memory / local / cached repos, ...) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (template language, entities, diff)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drydock_core::prelude::*;
//!
//! # fn run(repository: Box<dyn DefinitionRepository>, app: ApplicationSpec) -> DrydockResult<()> {
//! let service = RenderService::new(repository);
//! let context = RenderContext::new(&app.name, &app.namespace);
//! let rendered = service.render(&app, &context)?;
//! println!("{}", drydock_core::application::report::dry_run(&rendered)?);
//! # Ok(())
//! # }
//! ```

// Re-export domain layer (stable, well-defined API)
pub mod domain;

// Re-export application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        DefinitionReference, DiffService, LiveDiff, RenderService, ShowService,
        ports::{DefinitionRepository, RevisionStore},
        report,
    };
    pub use crate::domain::{
        ApplicationManifest, ApplicationSpec, ComponentDefinition, ComponentSpec, Definition,
        DefinitionKind, DiffEntry, ParameterDecl, RenderContext, RenderedApplication,
        RenderedResource, Revision, TraitDefinition,
    };
    pub use crate::error::{DrydockError, DrydockResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
