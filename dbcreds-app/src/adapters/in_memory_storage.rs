//! In-memory role and database configuration store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dbcreds_core::error::{CoreError, CoreResult};
use dbcreds_core::traits::Storage;
use dbcreds_core::types::{DatabaseConfig, Role};

use super::Catalog;

/// Writable [`Storage`] held in memory.
///
/// Writes are validated; replacing a database configuration here does not
/// touch cached backends, use `AppState::replace_database_config` for that.
#[derive(Default)]
pub struct InMemoryStorage {
    roles: RwLock<HashMap<String, Role>>,
    databases: RwLock<HashMap<String, DatabaseConfig>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store built from a catalog; fails on the first invalid entry.
    pub async fn from_catalog(catalog: Catalog) -> CoreResult<Self> {
        let storage = Self::new();
        for (name, config) in catalog.databases {
            storage.put_database_config(&name, config).await?;
        }
        for (_, role) in catalog.roles {
            storage.put_role(role).await?;
        }
        Ok(storage)
    }

    /// 新增或替换角色
    pub async fn put_role(&self, role: Role) -> CoreResult<()> {
        role.validate()?;
        log::debug!("Storing role {}", role.name);
        self.roles.write().await.insert(role.name.clone(), role);
        Ok(())
    }

    /// 删除角色，返回是否存在
    pub async fn remove_role(&self, name: &str) -> bool {
        self.roles.write().await.remove(name).is_some()
    }

    /// 新增或替换数据库配置
    pub async fn put_database_config(&self, name: &str, config: DatabaseConfig) -> CoreResult<()> {
        if name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "database name must not be empty".to_string(),
            ));
        }
        config
            .parsed_type()
            .map_err(|e| CoreError::ValidationError(format!("database {name}: {e}")))?;

        log::debug!("Storing database config {name} ({})", config.backend_type);
        self.databases
            .write()
            .await
            .insert(name.to_string(), config);
        Ok(())
    }

    /// 删除数据库配置，返回是否存在
    pub async fn remove_database_config(&self, name: &str) -> bool {
        self.databases.write().await.remove(name).is_some()
    }

    pub async fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_role(&self, name: &str) -> CoreResult<Option<Role>> {
        Ok(self.roles.read().await.get(name).cloned())
    }

    async fn get_database_config(&self, name: &str) -> CoreResult<Option<DatabaseConfig>> {
        Ok(self.databases.read().await.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcreds_core::types::Statements;
    use std::time::Duration;

    fn role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            db_name: "app".to_string(),
            default_ttl: Duration::from_secs(600),
            max_ttl: None,
            statements: Statements {
                creation: "CREATE USER {{name}}".to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn put_and_get() {
        let storage = InMemoryStorage::new();
        storage.put_role(role("readonly")).await.unwrap();
        storage
            .put_database_config(
                "app",
                DatabaseConfig {
                    backend_type: "postgres".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            storage.get_role("readonly").await.unwrap(),
            Some(role("readonly"))
        );
        assert!(storage.get_role("missing").await.unwrap().is_none());
        assert_eq!(storage.database_names().await, vec!["app".to_string()]);

        assert!(storage.remove_role("readonly").await);
        assert!(!storage.remove_role("readonly").await);
    }

    #[tokio::test]
    async fn rejects_invalid_entries() {
        let storage = InMemoryStorage::new();

        let mut no_ttl = role("readonly");
        no_ttl.default_ttl = Duration::ZERO;
        assert!(matches!(
            storage.put_role(no_ttl).await,
            Err(CoreError::ValidationError(_))
        ));

        let err = storage
            .put_database_config(
                "legacy",
                DatabaseConfig {
                    backend_type: "oracle".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }
}
