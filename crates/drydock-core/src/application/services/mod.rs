//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases: dry-run, live-diff and show.

pub mod diff_service;
pub mod render_service;
pub mod show_service;

pub use diff_service::{DiffService, LiveDiff};
pub use render_service::RenderService;
pub use show_service::{DefinitionReference, ShowService};
