use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};

// ============ Statements ============

/// Statement templates a role uses to manage the users it creates.
///
/// Each template may hold several statements separated by `;` and refers to
/// the generated credential through `{{name}}`, `{{password}}` and
/// `{{expiration}}` placeholders. See [`crate::template::render`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    /// Statements that create the user.
    #[serde(rename = "creation_statements", default)]
    pub creation: String,
    /// Statements that drop the user when the lease ends.
    #[serde(rename = "revocation_statements", default)]
    pub revocation: String,
    /// Statements executed when creation fails half-way.
    #[serde(rename = "rollback_statements", default)]
    pub rollback: String,
    /// Statements that extend the user's validity.
    #[serde(rename = "renew_statements", default)]
    pub renewal: String,
}

// ============ Backend Types ============

/// The closed set of backend type discriminators.
///
/// Parsing is an exact, case-sensitive match; anything else is
/// [`BackendError::UnsupportedBackendType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-process PostgreSQL backend. Requires feature `postgres`.
    #[cfg(feature = "postgres")]
    Postgres,
    /// Out-of-process backend driven over the plugin protocol.
    /// Requires feature `plugin`.
    #[cfg(feature = "plugin")]
    Plugin,
}

impl BackendType {
    /// The discriminator string stored in [`DatabaseConfig::backend_type`].
    pub fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres => "postgres",
            #[cfg(feature = "plugin")]
            Self::Plugin => "plugin",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            #[cfg(feature = "postgres")]
            "postgres" => Ok(Self::Postgres),
            #[cfg(feature = "plugin")]
            "plugin" => Ok(Self::Plugin),
            other => Err(BackendError::UnsupportedBackendType {
                backend_type: other.to_string(),
            }),
        }
    }
}

// ============ Database Config ============

/// Backend-specific connection details, kept opaque until a backend decodes
/// them into its own typed structure.
pub type ConnectionDetails = serde_json::Map<String, serde_json::Value>;

/// A named database configuration as stored by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Type discriminator, matched exactly against [`BackendType`].
    #[serde(rename = "type")]
    pub backend_type: String,
    /// Connection details; the schema depends on `backend_type`.
    #[serde(default)]
    pub connection_details: ConnectionDetails,
    /// Upper bound on open pool connections (0 = backend default).
    #[serde(default)]
    pub max_open_connections: u32,
    /// Upper bound on idle pool connections (0 = backend default).
    #[serde(default)]
    pub max_idle_connections: u32,
    /// Maximum lifetime of a pooled connection (0 = unlimited).
    #[serde(default, with = "crate::utils::ttl")]
    pub max_connection_lifetime: Duration,
    /// Role names allowed to use this database, or `"*"` for all.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

impl DatabaseConfig {
    /// Whether `role` may issue credentials against this database.
    pub fn allows_role(&self, role: &str) -> bool {
        self.allowed_roles.iter().any(|r| r == "*" || r == role)
    }

    /// Parse the type discriminator.
    pub fn parsed_type(&self) -> Result<BackendType> {
        self.backend_type.parse()
    }
}

/// Decode connection details into a backend's typed configuration.
///
/// Unknown keys are ignored so one details map can carry keys for both the
/// host (plugin runner) and the backend it launches.
pub fn decode_details<T: DeserializeOwned>(
    backend: &str,
    details: &ConnectionDetails,
) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(details.clone())).map_err(|e| {
        BackendError::InvalidConfig {
            backend: backend.to_string(),
            detail: e.to_string(),
        }
    })
}
