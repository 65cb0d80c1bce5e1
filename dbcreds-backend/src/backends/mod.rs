//! Database backend implementations

/// Shared utilities used by backend implementations.
pub mod common;

#[cfg(feature = "plugin")]
pub mod plugin;
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "plugin")]
pub use plugin::PluginClient;
#[cfg(feature = "postgres")]
pub use postgres::{PoolSettings, PostgresBackend, PostgresConnectionDetails};
