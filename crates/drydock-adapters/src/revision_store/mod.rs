//! Revision stores.

mod local;
mod memory;

pub use local::LocalRevisionStore;
pub use memory::InMemoryRevisionStore;
