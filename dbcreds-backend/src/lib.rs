//! # dbcreds-backend
//!
//! The database backend contract for dynamic credential issuance, with an
//! in-process PostgreSQL implementation and an out-of-process plugin
//! transport that drives any backend living in a separate executable.
//!
//! ## Supported Backends
//!
//! | Type | Feature Flag | Runs |
//! |------|-------------|------|
//! | `postgres` | `postgres` | In-process, `sqlx` pool |
//! | `plugin` | `plugin` | Child process over stdin/stdout |
//!
//! ## Feature Flags
//!
//! - **`all-backends`** *(default)*: Enable all backends listed above.
//! - **`postgres`**: Enable only the PostgreSQL backend.
//! - **`plugin`**: Enable the plugin client and server stubs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dbcreds_backend::{create_backend, DatabaseConfig, Statements};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: DatabaseConfig = serde_json::from_str(r#"{
//!         "type": "postgres",
//!         "connection_details": {"connection_url": "postgres://vault@localhost/app"},
//!         "allowed_roles": ["readonly"]
//!     }"#)?;
//!
//!     // 1. Create and initialize a backend
//!     let backend = create_backend(&config).await?;
//!     backend.initialize(&config.connection_details).await?;
//!
//!     // 2. Generate a credential
//!     let username = backend.generate_username("token-app").await?;
//!     let password = backend.generate_password().await?;
//!     let expiration = backend.generate_expiration(Duration::from_secs(3600)).await?;
//!
//!     // 3. Create the user
//!     let statements = Statements {
//!         creation: r#"CREATE ROLE "{{name}}" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}';"#.into(),
//!         ..Default::default()
//!     };
//!     backend.create_user(&statements, &username, &password, &expiration).await?;
//!
//!     backend.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Writing a Plugin
//!
//! A plugin executable serves any [`DatabaseBackend`] over stdio:
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "plugin", feature = "postgres"))]
//! #[tokio::main]
//! async fn main() -> dbcreds_backend::Result<()> {
//!     dbcreds_backend::plugin::serve(dbcreds_backend::PostgresBackend::new()).await
//! }
//! # #[cfg(not(all(feature = "plugin", feature = "postgres")))]
//! # fn main() {}
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, BackendError>`](BackendError). A failing
//! plugin channel is [`BackendError::Transport`]; every other variant is the
//! backend's own answer, forwarded unchanged across the process boundary.
//! Nothing is retried.

mod backends;
mod error;
mod factory;
pub mod template;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{BackendError, Result};

// Re-export factory functions
pub use factory::{create_backend, supported_backend_types};

// Re-export core trait only (internal traits are not exported)
pub use traits::DatabaseBackend;

// Re-export types
pub use types::{BackendType, ConnectionDetails, DatabaseConfig, Statements, decode_details};

// Re-export utils modules
pub use utils::{log_sanitizer, ttl};

/// Shared credential-formatting helpers for backend implementations.
pub use backends::common;

// Re-export concrete backends (behind feature flags)
#[cfg(feature = "plugin")]
pub use backends::plugin;
#[cfg(feature = "plugin")]
pub use backends::PluginClient;

#[cfg(feature = "postgres")]
pub use backends::{PoolSettings, PostgresBackend, PostgresConnectionDetails};
