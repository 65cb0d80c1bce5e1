//! Storage and factory abstraction trait definitions

mod backend_factory;
mod storage;

pub use backend_factory::{BackendFactory, DefaultBackendFactory};
pub use storage::Storage;
