//! 业务逻辑服务层

mod connection_service;
mod credential_service;

pub use connection_service::ConnectionService;
pub use credential_service::CredentialService;

use std::sync::Arc;

use dbcreds_backend::DatabaseBackend;

use crate::cache::BackendCache;
use crate::error::{CoreError, CoreResult};
use crate::traits::{BackendFactory, Storage};
use crate::types::{DatabaseConfig, Role};

/// 服务上下文 - 持有所有依赖
///
/// 平台层需要创建此上下文，并注入平台特定的存储实现。
pub struct ServiceContext {
    /// 角色与数据库配置存储
    pub storage: Arc<dyn Storage>,
    /// Backend 工厂
    pub factory: Arc<dyn BackendFactory>,
    /// Backend 句柄缓存
    pub cache: Arc<BackendCache>,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        factory: Arc<dyn BackendFactory>,
        cache: Arc<BackendCache>,
    ) -> Self {
        Self {
            storage,
            factory,
            cache,
        }
    }

    /// 获取角色
    pub async fn get_role(&self, name: &str) -> CoreResult<Role> {
        let mut role = self
            .storage
            .get_role(name)
            .await?
            .ok_or_else(|| CoreError::RoleNotFound(name.to_string()))?;
        if role.name.is_empty() {
            role.name = name.to_string();
        }
        Ok(role)
    }

    /// 获取数据库配置
    pub async fn get_database_config(&self, name: &str) -> CoreResult<DatabaseConfig> {
        self.storage
            .get_database_config(name)
            .await?
            .ok_or_else(|| CoreError::DatabaseConfigNotFound(name.to_string()))
    }

    /// 检查数据库配置的角色白名单
    pub fn authorize(role: &Role, config: &DatabaseConfig) -> CoreResult<()> {
        if config.allows_role(&role.name) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: role.name.clone(),
                database: role.db_name.clone(),
            })
        }
    }

    /// 获取（必要时创建）Backend 实例
    ///
    /// On a miss the cache reads the configuration itself, so a handle is
    /// never built from a configuration replaced since the caller looked.
    pub async fn get_backend(&self, db_name: &str) -> CoreResult<Arc<dyn DatabaseBackend>> {
        self.cache
            .get_or_create(db_name, &self.storage, &self.factory)
            .await
    }
}

/// 按错误类型选择日志级别
pub(crate) fn log_core_error(context: &str, err: &CoreError) {
    if err.is_expected() {
        log::warn!("{context}: {err}");
    } else {
        log::error!("{context}: {err}");
    }
}
