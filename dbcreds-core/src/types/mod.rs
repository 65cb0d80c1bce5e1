//! 类型定义模块

mod credential;
mod role;

pub use credential::{CredentialPayload, InternalData, IssuedCredential, LeaseMetadata, RenewedLease};
pub use role::Role;

// Re-export backend 库的公共类型
pub use dbcreds_backend::{BackendType, ConnectionDetails, DatabaseConfig, Statements};
