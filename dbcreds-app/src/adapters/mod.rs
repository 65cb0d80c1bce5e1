//! Storage adapters

mod catalog;
mod in_memory_storage;

pub use catalog::Catalog;
pub use in_memory_storage::InMemoryStorage;
