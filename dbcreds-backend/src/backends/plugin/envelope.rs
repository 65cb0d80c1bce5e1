//! RPC 请求/响应信封
//!
//! One request and one response record per contract operation. A request
//! frame carries a [`RequestEnvelope`], the answer a [`ResponseEnvelope`]
//! with the same `seq`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::types::{ConnectionDetails, Statements};

// ============ 请求 ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub statements: Statements,
    pub username: String,
    pub password: String,
    pub expiration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewUserRequest {
    pub statements: Statements,
    pub username: String,
    pub expiration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeUserRequest {
    pub statements: Statements,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateUsernameRequest {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateExpirationRequest {
    /// 秒
    #[serde(with = "crate::utils::ttl")]
    pub ttl: Duration,
}

/// A remote procedure call, tagged by its method name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "args")]
pub enum Call {
    #[serde(rename = "Plugin.Type")]
    Type,
    #[serde(rename = "Plugin.Initialize")]
    Initialize(InitializeRequest),
    #[serde(rename = "Plugin.CreateUser")]
    CreateUser(CreateUserRequest),
    #[serde(rename = "Plugin.RenewUser")]
    RenewUser(RenewUserRequest),
    #[serde(rename = "Plugin.RevokeUser")]
    RevokeUser(RevokeUserRequest),
    #[serde(rename = "Plugin.Close")]
    Close,
    #[serde(rename = "Plugin.GenerateUsername")]
    GenerateUsername(GenerateUsernameRequest),
    #[serde(rename = "Plugin.GeneratePassword")]
    GeneratePassword,
    #[serde(rename = "Plugin.GenerateExpiration")]
    GenerateExpiration(GenerateExpirationRequest),
}

impl Call {
    /// Wire name of the procedure, for logs and error messages.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Type => "Plugin.Type",
            Self::Initialize(_) => "Plugin.Initialize",
            Self::CreateUser(_) => "Plugin.CreateUser",
            Self::RenewUser(_) => "Plugin.RenewUser",
            Self::RevokeUser(_) => "Plugin.RevokeUser",
            Self::Close => "Plugin.Close",
            Self::GenerateUsername(_) => "Plugin.GenerateUsername",
            Self::GeneratePassword => "Plugin.GeneratePassword",
            Self::GenerateExpiration(_) => "Plugin.GenerateExpiration",
        }
    }
}

// ============ 响应 ============

/// Placeholder result of the void operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeResponse {
    pub backend_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateUsernameResponse {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratePasswordResponse {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateExpirationResponse {
    pub expiration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body")]
pub enum Reply {
    Type(TypeResponse),
    Empty(Empty),
    GenerateUsername(GenerateUsernameResponse),
    GeneratePassword(GeneratePasswordResponse),
    GenerateExpiration(GenerateExpirationResponse),
}

/// Either the operation's result or the backend's application error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok(Reply),
    Err(BackendError),
}

impl From<crate::error::Result<Reply>> for Outcome {
    fn from(result: crate::error::Result<Reply>) -> Self {
        match result {
            Ok(reply) => Self::Ok(reply),
            Err(e) => Self::Err(e),
        }
    }
}

// ============ 信封 ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub seq: u64,
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub seq: u64,
    pub outcome: Outcome,
}
