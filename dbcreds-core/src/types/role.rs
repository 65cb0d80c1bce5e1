//! 角色类型定义

use std::time::Duration;

use serde::{Deserialize, Serialize};

use dbcreds_backend::{Statements, ttl};

use crate::error::{CoreError, CoreResult};

/// A role: which database it issues credentials for, how long they live, and
/// the statements that manage them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// 角色名称（存储键）
    #[serde(default)]
    pub name: String,
    /// 目标数据库配置名称
    pub db_name: String,
    /// 默认租约时长（秒）
    #[serde(default, with = "ttl")]
    pub default_ttl: Duration,
    /// 续期上限（秒），`None` 表示不限制
    #[serde(
        default,
        with = "ttl::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_ttl: Option<Duration>,
    /// 用户管理语句
    #[serde(default)]
    pub statements: Statements,
}

impl Role {
    /// Check the invariants storage relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "role name must not be empty".to_string(),
            ));
        }
        if self.db_name.trim().is_empty() {
            return Err(CoreError::ValidationError(format!(
                "role {} has no db_name",
                self.name
            )));
        }
        if self.default_ttl.is_zero() {
            return Err(CoreError::ValidationError(format!(
                "role {} needs a non-zero default_ttl",
                self.name
            )));
        }
        if let Some(max_ttl) = self.max_ttl {
            if max_ttl < self.default_ttl {
                return Err(CoreError::ValidationError(format!(
                    "role {}: max_ttl is shorter than default_ttl",
                    self.name
                )));
            }
        }
        if self.statements.creation.trim().is_empty() {
            return Err(CoreError::ValidationError(format!(
                "role {} has no creation_statements",
                self.name
            )));
        }
        Ok(())
    }

    /// TTL granted for a renewal request of `increment`.
    ///
    /// Zero means the role default; the result never exceeds `max_ttl`.
    pub fn renewal_ttl(&self, increment: Duration) -> Duration {
        let requested = if increment.is_zero() {
            self.default_ttl
        } else {
            increment
        };
        match self.max_ttl {
            Some(max_ttl) => requested.min(max_ttl),
            None => requested,
        }
    }
}
