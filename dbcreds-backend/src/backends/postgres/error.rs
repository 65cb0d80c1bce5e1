//! PostgreSQL error mapping

use crate::error::BackendError;
use crate::traits::{BackendErrorMapper, RawDbError};

use super::{BACKEND_NAME, PostgresBackend};

/// SQLSTATE mapping
/// Reference: <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl BackendErrorMapper for PostgresBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn map_error(&self, raw: RawDbError) -> BackendError {
        match raw.code.as_deref() {
            // Class 08: Connection Exception
            // Class 28: Invalid Authorization Specification
            // 57P01: admin_shutdown
            Some(code) if code.starts_with("08") || code.starts_with("28") || code == "57P01" => {
                BackendError::ConnectionFailed {
                    backend: self.backend_name().to_string(),
                    detail: format!("{code}: {}", raw.message),
                }
            }

            // Everything else the server answered is a refusal of the statement:
            // 42710 duplicate_object, 42704 undefined_object, 42501 insufficient_privilege,
            // 2BP01 dependent_objects_still_exist, 42601 syntax_error, ...
            Some(code) => BackendError::Database {
                backend: self.backend_name().to_string(),
                detail: format!("{code}: {}", raw.message),
            },

            None => BackendError::Database {
                backend: self.backend_name().to_string(),
                detail: raw.message,
            },
        }
    }
}

impl PostgresBackend {
    /// Map a driver error, separating server answers from I/O failures.
    pub(crate) fn map_sqlx_error(&self, err: sqlx::Error) -> BackendError {
        match err {
            sqlx::Error::Database(db_err) => {
                let raw = match db_err.code() {
                    Some(code) => RawDbError::with_code(code.into_owned(), db_err.message()),
                    None => RawDbError::new(db_err.message()),
                };
                self.map_error(raw)
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => BackendError::ConnectionFailed {
                backend: self.backend_name().to_string(),
                detail: err.to_string(),
            },
            other => self.map_error(RawDbError::new(other.to_string())),
        }
    }
}
