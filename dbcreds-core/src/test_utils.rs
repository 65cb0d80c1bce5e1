//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dbcreds_backend::{BackendError, ConnectionDetails, DatabaseBackend, Statements};
use serde_json::json;
use tokio::sync::RwLock;

use crate::cache::BackendCache;
use crate::error::CoreResult;
use crate::services::ServiceContext;
use crate::traits::{BackendFactory, Storage};
use crate::types::{DatabaseConfig, Role};

// ===== MockStorage =====

pub struct MockStorage {
    roles: RwLock<HashMap<String, Role>>,
    databases: RwLock<HashMap<String, DatabaseConfig>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            databases: RwLock::new(HashMap::new()),
        }
    }

    pub async fn put_role(&self, role: Role) {
        self.roles.write().await.insert(role.name.clone(), role);
    }

    pub async fn put_database_config(&self, name: &str, config: DatabaseConfig) {
        self.databases
            .write()
            .await
            .insert(name.to_string(), config);
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn get_role(&self, name: &str) -> CoreResult<Option<Role>> {
        Ok(self.roles.read().await.get(name).cloned())
    }

    async fn get_database_config(&self, name: &str) -> CoreResult<Option<DatabaseConfig>> {
        Ok(self.databases.read().await.get(name).cloned())
    }
}

// ===== MockBackend =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub username: String,
    pub password: String,
    pub expiration: String,
}

/// Shared record of every call made on a [`MockBackend`] and its clones.
#[derive(Debug, Default)]
pub struct Recorded {
    calls: Mutex<Vec<&'static str>>,
    created: Mutex<Vec<CreatedUser>>,
    revoked: Mutex<Vec<String>>,
    display_names: Mutex<Vec<String>>,
    connection_urls: Mutex<Vec<String>>,
}

impl Recorded {
    fn push(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn created(&self) -> Vec<CreatedUser> {
        self.created.lock().unwrap().clone()
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.display_names.lock().unwrap().clone()
    }

    /// `connection_url` of every `initialize` call, in order.
    pub fn connection_urls(&self) -> Vec<String> {
        self.connection_urls.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub recorded: Arc<Recorded>,
    credentials: Option<(String, String)>,
    initialize_error: Option<BackendError>,
    create_error: Option<BackendError>,
    close_error: Option<BackendError>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed username/password instead of generated ones.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn with_initialize_error(mut self, err: BackendError) -> Self {
        self.initialize_error = Some(err);
        self
    }

    pub fn with_create_error(mut self, err: BackendError) -> Self {
        self.create_error = Some(err);
        self
    }

    pub fn with_close_error(mut self, err: BackendError) -> Self {
        self.close_error = Some(err);
        self
    }
}

fn respond(err: Option<&BackendError>) -> dbcreds_backend::Result<()> {
    match err {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl DatabaseBackend for MockBackend {
    async fn backend_type(&self) -> dbcreds_backend::Result<String> {
        self.recorded.push("Type");
        Ok("mock".to_string())
    }

    async fn initialize(&self, details: &ConnectionDetails) -> dbcreds_backend::Result<()> {
        self.recorded.push("Initialize");
        if let Some(url) = details.get("connection_url").and_then(|v| v.as_str()) {
            self.recorded
                .connection_urls
                .lock()
                .unwrap()
                .push(url.to_string());
        }
        respond(self.initialize_error.as_ref())
    }

    async fn create_user(
        &self,
        _statements: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> dbcreds_backend::Result<()> {
        self.recorded.push("CreateUser");
        respond(self.create_error.as_ref())?;
        self.recorded.created.lock().unwrap().push(CreatedUser {
            username: username.to_string(),
            password: password.to_string(),
            expiration: expiration.to_string(),
        });
        Ok(())
    }

    async fn renew_user(
        &self,
        _statements: &Statements,
        _username: &str,
        _expiration: &str,
    ) -> dbcreds_backend::Result<()> {
        self.recorded.push("RenewUser");
        Ok(())
    }

    async fn revoke_user(
        &self,
        _statements: &Statements,
        username: &str,
    ) -> dbcreds_backend::Result<()> {
        self.recorded.push("RevokeUser");
        self.recorded
            .revoked
            .lock()
            .unwrap()
            .push(username.to_string());
        Ok(())
    }

    async fn close(&self) -> dbcreds_backend::Result<()> {
        self.recorded.push("Close");
        respond(self.close_error.as_ref())
    }

    async fn generate_username(&self, display_name: &str) -> dbcreds_backend::Result<String> {
        self.recorded.push("GenerateUsername");
        self.recorded
            .display_names
            .lock()
            .unwrap()
            .push(display_name.to_string());
        Ok(match &self.credentials {
            Some((username, _)) => username.clone(),
            None => format!("v-{display_name}"),
        })
    }

    async fn generate_password(&self) -> dbcreds_backend::Result<String> {
        self.recorded.push("GeneratePassword");
        Ok(match &self.credentials {
            Some((_, password)) => password.clone(),
            None => "generated-password".to_string(),
        })
    }

    async fn generate_expiration(&self, ttl: Duration) -> dbcreds_backend::Result<String> {
        self.recorded.push("GenerateExpiration");
        Ok(format!("+{}s", ttl.as_secs()))
    }
}

// ===== CountingFactory =====

/// Factory that hands out clones of one [`MockBackend`] and counts calls.
pub struct CountingFactory {
    pub backend: MockBackend,
    creates: AtomicUsize,
    delay: Option<Duration>,
    error: Option<BackendError>,
}

impl CountingFactory {
    pub fn new(backend: MockBackend) -> Self {
        Self {
            backend,
            creates: AtomicUsize::new(0),
            delay: None,
            error: None,
        }
    }

    pub fn failing(err: BackendError) -> Self {
        Self {
            error: Some(err),
            ..Self::new(MockBackend::new())
        }
    }

    /// Sleep inside `create` to widen the race window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendFactory for CountingFactory {
    async fn create(
        &self,
        _config: &DatabaseConfig,
    ) -> dbcreds_backend::Result<Arc<dyn DatabaseBackend>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(Arc::new(self.backend.clone())),
        }
    }
}

// ===== 测试工厂方法 =====

pub fn postgres_config() -> DatabaseConfig {
    postgres_config_at("postgres://localhost/app")
}

pub fn postgres_config_at(connection_url: &str) -> DatabaseConfig {
    DatabaseConfig {
        backend_type: "postgres".to_string(),
        connection_details: json!({"connection_url": connection_url})
            .as_object()
            .cloned()
            .unwrap_or_default(),
        allowed_roles: vec!["*".to_string()],
        ..Default::default()
    }
}

pub fn test_role(name: &str, db_name: &str) -> Role {
    Role {
        name: name.to_string(),
        db_name: db_name.to_string(),
        default_ttl: Duration::from_secs(3600),
        max_ttl: None,
        statements: Statements {
            creation: "CREATE USER {{name}} WITH PASSWORD {{password}}".to_string(),
            ..Default::default()
        },
    }
}

pub fn create_test_context(
    storage: Arc<MockStorage>,
    factory: Arc<CountingFactory>,
) -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(
        storage,
        factory,
        Arc::new(BackendCache::new()),
    ))
}
