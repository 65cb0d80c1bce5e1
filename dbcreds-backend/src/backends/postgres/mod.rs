//! PostgreSQL backend

mod backend;
mod connection;
mod error;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::backends::common::SqlCredentialsProducer;
use crate::error::Result;
use crate::types::DatabaseConfig;

pub use connection::{PoolSettings, PostgresConnectionDetails};

pub(crate) const BACKEND_NAME: &str = "postgres";

/// PostgreSQL identifiers are limited to 63 bytes.
const USERNAME_LEN: usize = 63;
/// Bytes left for the display name inside a generated username.
const DISPLAY_NAME_LEN: usize = 23;

/// Used when a role carries no renewal statements.
pub(crate) const DEFAULT_RENEW_STATEMENTS: &str =
    r#"ALTER ROLE "{{name}}" VALID UNTIL '{{expiration}}';"#;

/// Used when a role carries no revocation statements.
pub(crate) const DEFAULT_REVOKE_STATEMENTS: &str = r#"
REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA public FROM "{{name}}";
DROP ROLE IF EXISTS "{{name}}";
"#;

/// In-process PostgreSQL backend.
///
/// Construction only validates configuration; the pool is opened by
/// [`initialize`](crate::DatabaseBackend::initialize).
#[derive(Debug)]
pub struct PostgresBackend {
    pub(crate) pool_defaults: PoolSettings,
    pub(crate) pool: RwLock<Option<PgPool>>,
    pub(crate) credentials: SqlCredentialsProducer,
}

impl PostgresBackend {
    /// Backend with default pool settings, configured entirely by `initialize`.
    ///
    /// This is what a plugin process serves: the host forwards the connection
    /// details through the `Initialize` call.
    pub fn new() -> Self {
        Self::with_pool_defaults(PoolSettings::default())
    }

    /// Backend for a stored configuration.
    ///
    /// Decodes the connection details up front so a malformed configuration is
    /// rejected before anything is cached; pool tuning from the configuration
    /// becomes the default for `initialize`.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        PostgresConnectionDetails::decode(&config.connection_details)?;
        Ok(Self::with_pool_defaults(PoolSettings::from_config(config)))
    }

    fn with_pool_defaults(pool_defaults: PoolSettings) -> Self {
        Self {
            pool_defaults,
            pool: RwLock::new(None),
            credentials: SqlCredentialsProducer {
                display_name_len: DISPLAY_NAME_LEN,
                username_len: USERNAME_LEN,
            },
        }
    }
}

impl Default for PostgresBackend {
    fn default() -> Self {
        Self::new()
    }
}
