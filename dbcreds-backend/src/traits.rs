use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BackendError, Result};
use crate::types::{ConnectionDetails, Statements};

/// 原始驱动错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawDbError {
    /// SQLSTATE 或驱动错误码
    pub code: Option<String>,
    /// 原始错误消息
    pub message: String,
}

impl RawDbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Backend 错误映射 Trait（内部使用）
/// 各 Backend 实现此 trait 以将驱动错误映射到统一错误类型
pub(crate) trait BackendErrorMapper {
    /// 返回 Backend 标识符
    fn backend_name(&self) -> &'static str;

    /// 将原始驱动错误映射到统一错误类型
    fn map_error(&self, raw: RawDbError) -> BackendError;

    /// 快捷方法：连接池未建立
    fn not_initialized(&self) -> BackendError {
        BackendError::NotInitialized {
            backend: self.backend_name().to_string(),
        }
    }

    /// 快捷方法：参数错误
    fn invalid_parameter(&self, param: &str, detail: impl ToString) -> BackendError {
        BackendError::InvalidParameter {
            backend: self.backend_name().to_string(),
            param: param.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// 数据库后端 Trait
///
/// The capability contract every backend implements, whether it runs in the
/// host process or in a plugin process behind the RPC stubs. Callers hold a
/// backend as `Arc<dyn DatabaseBackend>` and cannot tell the two apart except
/// through [`BackendError::Transport`](crate::BackendError::Transport).
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// 后端标识符
    async fn backend_type(&self) -> Result<String>;

    /// 建立连接池
    ///
    /// Malformed connection details fail with
    /// [`BackendError::InvalidConfig`](crate::BackendError::InvalidConfig).
    async fn initialize(&self, details: &ConnectionDetails) -> Result<()>;

    /// 创建用户
    async fn create_user(
        &self,
        statements: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> Result<()>;

    /// 续期用户
    async fn renew_user(
        &self,
        statements: &Statements,
        username: &str,
        expiration: &str,
    ) -> Result<()>;

    /// 撤销用户
    async fn revoke_user(&self, statements: &Statements, username: &str) -> Result<()>;

    /// 释放连接池（插件后端同时结束插件进程）
    async fn close(&self) -> Result<()>;

    /// 生成用户名，`display_name` 用于审计
    async fn generate_username(&self, display_name: &str) -> Result<String>;

    /// 生成密码
    async fn generate_password(&self) -> Result<String>;

    /// 将 `now + ttl` 格式化为后端需要的过期时间文本
    async fn generate_expiration(&self, ttl: Duration) -> Result<String>;
}
