//! Role and database configuration storage abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{DatabaseConfig, Role};

/// Read side of the role and database-configuration store.
///
/// Lookups return `Ok(None)` for unknown names; `Err` is reserved for the
/// store itself failing.
///
/// Platform implementation:
/// - `InMemoryStorage` (dbcreds-app), optionally loaded from a JSON catalog
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a role by name
    ///
    /// # Arguments
    /// * `name` - Role name
    async fn get_role(&self, name: &str) -> CoreResult<Option<Role>>;

    /// Get a database configuration by name
    ///
    /// # Arguments
    /// * `name` - Database configuration name
    async fn get_database_config(&self, name: &str) -> CoreResult<Option<DatabaseConfig>>;
}
