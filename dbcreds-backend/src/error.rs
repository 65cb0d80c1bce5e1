use serde::{Deserialize, Serialize};

/// Unified error type for all database backend operations.
///
/// Each variant carries a `backend` field identifying which backend produced
/// the error. All variants are serializable: when a backend runs
/// out-of-process, this is the payload the plugin sends back for a failed
/// operation, so the host sees the same variant the plugin produced.
///
/// # Transport vs. application errors
///
/// [`Transport`](Self::Transport) is only ever produced on the host side of a
/// plugin channel (spawn failure, handshake rejection, broken pipe, undecodable
/// frame). Every other variant is an application error returned by a backend
/// implementation, local or remote. Use [`is_transport`](Self::is_transport)
/// to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum BackendError {
    /// The connection details could not be decoded into the backend's typed
    /// configuration (missing field, wrong type, empty value).
    InvalidConfig {
        /// Backend that rejected the configuration.
        backend: String,
        /// Decoder message.
        detail: String,
    },

    /// The configuration's type discriminator is not in the supported set.
    UnsupportedBackendType {
        /// The discriminator that was requested.
        backend_type: String,
    },

    /// The plugin channel failed: the process could not be started, the
    /// handshake was rejected, the pipe broke, or a frame could not be decoded.
    Transport {
        /// Backend (plugin) whose channel failed.
        backend: String,
        /// Error details.
        detail: String,
    },

    /// An operation was invoked before `initialize` succeeded, or after `close`.
    NotInitialized {
        /// Backend that is not initialized.
        backend: String,
    },

    /// The database could not be reached while establishing the pool.
    ConnectionFailed {
        /// Backend that failed to connect.
        backend: String,
        /// Driver message.
        detail: String,
    },

    /// An argument to a backend operation is out of range.
    InvalidParameter {
        /// Backend that rejected the argument.
        backend: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// The database refused a statement (constraint violation, missing role,
    /// insufficient privilege, ...).
    Database {
        /// Backend that executed the statement.
        backend: String,
        /// Driver message.
        detail: String,
    },
}

impl BackendError {
    /// Whether the error is a channel failure rather than a backend's answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether the error is a configuration problem (decode failure or an
    /// unknown discriminator) that no retry can fix.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::UnsupportedBackendType { .. }
        )
    }

    /// Whether the error is caused by operator input rather than a failing
    /// system; used to pick the log level.
    ///
    /// `true` should be logged at `warn`, `false` at `error`.
    /// **Keep this in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::UnsupportedBackendType { .. }
                | Self::InvalidParameter { .. }
                | Self::Database { .. }
        )
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig { backend, detail } => {
                write!(f, "[{backend}] Invalid configuration: {detail}")
            }
            Self::UnsupportedBackendType { backend_type } => {
                write!(f, "Unsupported database type: {backend_type}")
            }
            Self::Transport { backend, detail } => {
                write!(f, "[{backend}] Plugin transport error: {detail}")
            }
            Self::NotInitialized { backend } => {
                write!(f, "[{backend}] Backend is not initialized")
            }
            Self::ConnectionFailed { backend, detail } => {
                write!(f, "[{backend}] Connection failed: {detail}")
            }
            Self::InvalidParameter {
                backend,
                param,
                detail,
            } => {
                write!(f, "[{backend}] Invalid parameter '{param}': {detail}")
            }
            Self::Database { backend, detail } => {
                write!(f, "[{backend}] Database error: {detail}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Convenience type alias for `Result<T, BackendError>`.
pub type Result<T> = std::result::Result<T, BackendError>;
