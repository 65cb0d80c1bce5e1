//! Backend factory.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::DatabaseBackend;
use crate::types::{BackendType, DatabaseConfig};

#[cfg(feature = "plugin")]
use crate::backends::plugin::{DATABASE_PLUGIN_HANDSHAKE, PluginRunner, connect};
#[cfg(feature = "postgres")]
use crate::backends::PostgresBackend;

/// Creates a [`DatabaseBackend`] for the given configuration.
///
/// The concrete backend is chosen by an exact match of
/// [`DatabaseConfig::backend_type`]; an unknown discriminator is
/// [`BackendError::UnsupportedBackendType`](crate::BackendError::UnsupportedBackendType).
/// The connection details are decoded here, so a malformed configuration
/// fails before anything is returned.
///
/// The returned backend is not yet initialized: call
/// [`DatabaseBackend::initialize`] with the configuration's connection details
/// before using it. For `plugin` this already spawns the plugin process and
/// completes the handshake.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> dbcreds_backend::Result<()> {
/// use dbcreds_backend::{create_backend, DatabaseConfig};
///
/// let config: DatabaseConfig = serde_json::from_str(
///     r#"{"type": "postgres", "connection_details": {"connection_url": "postgres://localhost/app"}}"#,
/// ).unwrap();
/// let backend = create_backend(&config).await?;
/// backend.initialize(&config.connection_details).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_backend(config: &DatabaseConfig) -> Result<Arc<dyn DatabaseBackend>> {
    match config.parsed_type()? {
        #[cfg(feature = "postgres")]
        BackendType::Postgres => Ok(Arc::new(PostgresBackend::from_config(config)?)),
        #[cfg(feature = "plugin")]
        BackendType::Plugin => {
            let runner = PluginRunner::decode(&config.connection_details)?;
            Ok(Arc::new(connect(&runner, &DATABASE_PLUGIN_HANDSHAKE).await?))
        }
    }
}

/// Returns the type discriminators enabled via feature flags.
pub fn supported_backend_types() -> Vec<BackendType> {
    vec![
        #[cfg(feature = "postgres")]
        BackendType::Postgres,
        #[cfg(feature = "plugin")]
        BackendType::Plugin,
    ]
}
