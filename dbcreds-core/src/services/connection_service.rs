//! 数据库连接管理服务

use std::sync::Arc;

use crate::error::CoreResult;
use crate::services::{log_core_error, ServiceContext};

/// Lifecycle of cached backend handles.
pub struct ConnectionService {
    ctx: Arc<ServiceContext>,
}

impl ConnectionService {
    /// 创建连接管理服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Names of databases with a live handle.
    pub async fn list_connections(&self) -> Vec<String> {
        self.ctx.cache.names().await
    }

    /// Close the handle for `db_name` and build a fresh one from the current
    /// configuration.
    pub async fn reset(&self, db_name: &str) -> CoreResult<()> {
        // 配置不存在时保留旧句柄
        self.ctx.get_database_config(db_name).await?;

        if let Err(e) = self.ctx.cache.close(db_name).await {
            // 旧句柄关闭失败不影响重建
            log_core_error(&format!("Reset {db_name}: closing old handle"), &e);
        }

        self.ctx
            .get_backend(db_name)
            .await
            .inspect_err(|e| log_core_error(&format!("Reset {db_name}"), e))?;
        log::info!("Connection reset: {db_name}");
        Ok(())
    }

    /// Close and evict the handle for `db_name`.
    ///
    /// Returns whether a handle was cached.
    pub async fn close(&self, db_name: &str) -> CoreResult<bool> {
        self.ctx
            .cache
            .close(db_name)
            .await
            .inspect_err(|e| log_core_error(&format!("Close {db_name}"), e))
    }

    /// Drop the handle for `db_name` after its configuration was replaced;
    /// the next request builds one from the new configuration.
    pub async fn replace_config(&self, db_name: &str) {
        self.ctx.cache.invalidate(db_name).await;
    }

    /// Close every handle (shutdown path).
    pub async fn close_all(&self) {
        let names = self.ctx.cache.names().await;
        self.ctx.cache.close_all().await;
        log::info!("Closed {} backend connection(s)", names.len());
    }
}
