//! 凭证与租约类型定义

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dbcreds_backend::ttl;

use crate::error::{CoreError, CoreResult};

/// Opaque data the lease subsystem stores with a lease and hands back on
/// renewal and revocation.
pub type InternalData = serde_json::Map<String, Value>;

/// The secret returned to the caller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// What the lease needs to find the user again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseMetadata {
    pub username: String,
    pub role: String,
}

impl LeaseMetadata {
    /// Form stored by the lease subsystem.
    pub fn to_internal(&self) -> InternalData {
        let mut data = InternalData::new();
        data.insert("username".to_string(), Value::String(self.username.clone()));
        data.insert("role".to_string(), Value::String(self.role.clone()));
        data
    }

    /// Parse stored internal data; both fields must be non-empty strings.
    pub fn from_internal(data: &InternalData) -> CoreResult<Self> {
        let field = |key: &str| -> CoreResult<String> {
            match data.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                Some(_) => Err(CoreError::InvalidLeaseMetadata(format!(
                    "{key} must be a non-empty string"
                ))),
                None => Err(CoreError::InvalidLeaseMetadata(format!("missing {key}"))),
            }
        };

        Ok(Self {
            username: field("username")?,
            role: field("role")?,
        })
    }
}

/// A freshly issued credential, ready to be wrapped in a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredential {
    /// Returned to the caller.
    pub payload: CredentialPayload,
    /// Kept with the lease, never shown to the caller.
    pub metadata: LeaseMetadata,
    /// Lease TTL (seconds).
    #[serde(with = "ttl")]
    pub ttl: Duration,
    /// Expiration text handed to the backend.
    pub expiration: String,
    pub issued_at: DateTime<Utc>,
}

/// Result of a successful renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewedLease {
    /// TTL actually granted (seconds).
    #[serde(with = "ttl")]
    pub ttl: Duration,
    pub expiration: String,
}
