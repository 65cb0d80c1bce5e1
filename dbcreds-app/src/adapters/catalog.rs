//! JSON catalog of roles and database configurations
//!
//! ```json
//! {
//!   "databases": {
//!     "app": {
//!       "type": "postgres",
//!       "connection_details": {"connection_url": "postgres://vault@db/app"},
//!       "allowed_roles": ["readonly"]
//!     }
//!   },
//!   "roles": {
//!     "readonly": {
//!       "db_name": "app",
//!       "default_ttl": "1h",
//!       "max_ttl": "24h",
//!       "statements": {
//!         "creation_statements": "CREATE ROLE \"{{name}}\" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';"
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dbcreds_core::error::{CoreError, CoreResult};
use dbcreds_core::types::{DatabaseConfig, Role};

/// Roles and database configurations keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub databases: HashMap<String, DatabaseConfig>,
    #[serde(default)]
    pub roles: HashMap<String, Role>,
}

impl Catalog {
    /// Parse a catalog; role names are taken from their keys.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let mut catalog: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::ValidationError(format!("Invalid catalog: {e}")))?;
        for (name, role) in &mut catalog.roles {
            role.name.clone_from(name);
        }
        Ok(catalog)
    }

    /// Read and parse a catalog file.
    pub async fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            CoreError::StorageError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&json)?;
        log::info!(
            "Loaded catalog {}: {} database(s), {} role(s)",
            path.display(),
            catalog.databases.len(),
            catalog.roles.len()
        );
        Ok(catalog)
    }
}
