//! 凭证签发服务
//!
//! Turns "credentials for role X" into a permission check, a cache lookup
//! and a backend call. Nothing is persisted here: the returned
//! [`IssuedCredential`] is wrapped into a lease by the caller, which later
//! calls back into [`renew`](CredentialService::renew) and
//! [`revoke`](CredentialService::revoke) with the lease's internal data.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use dbcreds_backend::{BackendError, DatabaseBackend};

use crate::error::{CoreError, CoreResult};
use crate::services::{log_core_error, ServiceContext};
use crate::types::{
    CredentialPayload, InternalData, IssuedCredential, LeaseMetadata, RenewedLease, Role,
};

fn operation_failed(operation: &'static str) -> impl FnOnce(BackendError) -> CoreError {
    move |source| CoreError::BackendOperation {
        operation: operation.to_string(),
        source,
    }
}

/// 凭证签发服务
pub struct CredentialService {
    ctx: Arc<ServiceContext>,
}

impl CredentialService {
    /// 创建凭证服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Role, allow-list check and live backend for `role_name`.
    ///
    /// The allow-list is checked before the cache is touched, so a denied
    /// request never starts a plugin or opens a pool. The cache looks the
    /// configuration up again on a miss.
    async fn resolve(&self, role_name: &str) -> CoreResult<(Role, Arc<dyn DatabaseBackend>)> {
        let role = self.ctx.get_role(role_name).await?;
        let config = self.ctx.get_database_config(&role.db_name).await?;
        ServiceContext::authorize(&role, &config)?;
        let backend = self.ctx.get_backend(&role.db_name).await?;
        Ok((role, backend))
    }

    /// 为角色签发新的数据库凭证
    ///
    /// `display_name` ends up in the generated username for auditing.
    pub async fn issue(&self, role_name: &str, display_name: &str) -> CoreResult<IssuedCredential> {
        let result = self.issue_inner(role_name, display_name).await;
        match &result {
            Ok(issued) => log::info!(
                "Issued credentials for role {role_name}: {} (ttl {}s)",
                issued.payload.username,
                issued.ttl.as_secs()
            ),
            Err(e) => log_core_error(&format!("Issue credentials for role {role_name}"), e),
        }
        result
    }

    async fn issue_inner(&self, role_name: &str, display_name: &str) -> CoreResult<IssuedCredential> {
        let (role, backend) = self.resolve(role_name).await?;

        let expiration = backend
            .generate_expiration(role.default_ttl)
            .await
            .map_err(operation_failed("GenerateExpiration"))?;
        let username = backend
            .generate_username(display_name)
            .await
            .map_err(operation_failed("GenerateUsername"))?;
        let password = backend
            .generate_password()
            .await
            .map_err(operation_failed("GeneratePassword"))?;

        backend
            .create_user(&role.statements, &username, &password, &expiration)
            .await
            .map_err(operation_failed("CreateUser"))?;

        Ok(IssuedCredential {
            metadata: LeaseMetadata {
                username: username.clone(),
                role: role.name.clone(),
            },
            payload: CredentialPayload { username, password },
            ttl: role.default_ttl,
            expiration,
            issued_at: Utc::now(),
        })
    }

    /// 续期租约
    ///
    /// `increment` of zero asks for the role default; the granted TTL is
    /// capped by the role's `max_ttl`.
    pub async fn renew(&self, internal: &InternalData, increment: Duration) -> CoreResult<RenewedLease> {
        let result = self.renew_inner(internal, increment).await;
        if let Err(e) = &result {
            log_core_error("Renew lease", e);
        }
        result
    }

    async fn renew_inner(&self, internal: &InternalData, increment: Duration) -> CoreResult<RenewedLease> {
        let metadata = LeaseMetadata::from_internal(internal)?;
        let (role, backend) = self.resolve(&metadata.role).await?;

        let ttl = role.renewal_ttl(increment);
        let expiration = backend
            .generate_expiration(ttl)
            .await
            .map_err(operation_failed("GenerateExpiration"))?;
        backend
            .renew_user(&role.statements, &metadata.username, &expiration)
            .await
            .map_err(operation_failed("RenewUser"))?;

        log::info!(
            "Renewed {} (role {}) for {}s",
            metadata.username,
            metadata.role,
            ttl.as_secs()
        );
        Ok(RenewedLease { ttl, expiration })
    }

    /// 撤销租约并删除数据库用户
    pub async fn revoke(&self, internal: &InternalData) -> CoreResult<()> {
        let result = self.revoke_inner(internal).await;
        if let Err(e) = &result {
            log_core_error("Revoke lease", e);
        }
        result
    }

    async fn revoke_inner(&self, internal: &InternalData) -> CoreResult<()> {
        let metadata = LeaseMetadata::from_internal(internal)?;
        let (role, backend) = self.resolve(&metadata.role).await?;

        backend
            .revoke_user(&role.statements, &metadata.username)
            .await
            .map_err(operation_failed("RevokeUser"))?;

        log::info!("Revoked {} (role {})", metadata.username, metadata.role);
        Ok(())
    }
}
