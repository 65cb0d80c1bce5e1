//! dbcreds Core Library
//!
//! Provides the credential issuance logic, including:
//! - Backend handle cache (one live backend per database configuration)
//! - Credential Service (issue / renew / revoke)
//! - Connection Service (reset / close / invalidate cached backends)
//!
//! This library is platform-independent: roles and database configurations
//! come from a [`Storage`] implementation and backends from a
//! [`BackendFactory`], both injected through [`ServiceContext`].

pub mod cache;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use cache::BackendCache;
pub use error::{CoreError, CoreResult};
pub use services::{ConnectionService, CredentialService, ServiceContext};
pub use traits::{BackendFactory, DefaultBackendFactory, Storage};
