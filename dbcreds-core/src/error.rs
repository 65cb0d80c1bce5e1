//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use dbcreds_backend::BackendError;

/// Core layer error type
///
/// `Clone` because one backend construction result is handed to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Role not found
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Database configuration not found
    #[error("Database configuration not found: {0}")]
    DatabaseConfigNotFound(String),

    /// The database's allow-list does not admit the role
    #[error("Role {role} is not allowed to use database {database}")]
    PermissionDenied { role: String, database: String },

    /// No live backend could be obtained (unsupported type, bad connection
    /// details, plugin failed to start, initialize failed)
    #[error("Backend unavailable for database {database}: {source}")]
    BackendUnavailable {
        database: String,
        source: BackendError,
    },

    /// The handle was closed, or its configuration kept changing, while it
    /// was being built
    #[error("Backend for database {database} was evicted during construction")]
    BackendEvicted { database: String },

    /// A backend operation failed on a live handle
    #[error("Backend operation {operation} failed: {source}")]
    BackendOperation {
        operation: String,
        source: BackendError,
    },

    /// Lease metadata lacks the fields needed to renew or revoke
    #[error("Invalid lease metadata: {0}")]
    InvalidLeaseMetadata(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added. **
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::RoleNotFound(_)
            | Self::DatabaseConfigNotFound(_)
            | Self::PermissionDenied { .. }
            | Self::InvalidLeaseMetadata(_)
            | Self::BackendEvicted { .. }
            | Self::ValidationError(_) => true,
            Self::BackendUnavailable { source, .. } | Self::BackendOperation { source, .. } => {
                source.is_expected()
            }
            Self::StorageError(_) => false,
        }
    }

    /// The backend error behind this error, if any.
    #[must_use]
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::BackendUnavailable { source, .. } | Self::BackendOperation { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// Whether a plugin channel failure caused this error.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.backend_error().is_some_and(BackendError::is_transport)
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
