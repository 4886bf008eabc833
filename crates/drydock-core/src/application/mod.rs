//! Application layer for drydock.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (RenderService, DiffService, ShowService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Report**: Plain-text dry-run and diff reports
//! - **Errors**: Application-specific error types
//!
//! The application layer coordinates the domain layer but contains no
//! business logic itself. All business rules live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod report;
pub mod services;

// Re-export main services
pub use services::{
    DefinitionReference, // DTO for `show`
    DiffService,
    LiveDiff,
    RenderService,
    ShowService,
};

// Re-export port traits (for adapter implementation)
pub use ports::{DefinitionRepository, RevisionStore};

pub use error::ApplicationError;
