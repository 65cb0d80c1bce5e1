//! 通过插件通道签发凭证的端到端测试
//!
//! The factory serves a stub backend on an in-memory pipe and returns the
//! RPC client for it, so the full issue path crosses the wire protocol.

#![cfg(feature = "plugin")]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dbcreds_backend::plugin::{
    PluginClient, PluginProcess, PluginServer, DATABASE_PLUGIN_HANDSHAKE,
};
use dbcreds_backend::{BackendError, ConnectionDetails, DatabaseBackend, Statements};
use dbcreds_core::types::{DatabaseConfig, LeaseMetadata, Role};
use dbcreds_core::{
    BackendCache, BackendFactory, CoreError, CoreResult, CredentialService, ServiceContext,
    Storage,
};
use serde_json::json;

// ============ Plugin side ============

#[derive(Clone, Default)]
struct StubBackend {
    created: Arc<Mutex<Vec<(String, String, String)>>>,
    fail_create: bool,
}

#[async_trait]
impl DatabaseBackend for StubBackend {
    async fn backend_type(&self) -> dbcreds_backend::Result<String> {
        Ok("stub".to_string())
    }

    async fn initialize(&self, _: &ConnectionDetails) -> dbcreds_backend::Result<()> {
        Ok(())
    }

    async fn create_user(
        &self,
        _: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> dbcreds_backend::Result<()> {
        if self.fail_create {
            return Err(BackendError::Database {
                backend: "stub".to_string(),
                detail: "permission denied to create role".to_string(),
            });
        }
        self.created.lock().unwrap().push((
            username.to_string(),
            password.to_string(),
            expiration.to_string(),
        ));
        Ok(())
    }

    async fn renew_user(&self, _: &Statements, _: &str, _: &str) -> dbcreds_backend::Result<()> {
        Ok(())
    }

    async fn revoke_user(&self, _: &Statements, _: &str) -> dbcreds_backend::Result<()> {
        Ok(())
    }

    async fn close(&self) -> dbcreds_backend::Result<()> {
        Ok(())
    }

    async fn generate_username(&self, _: &str) -> dbcreds_backend::Result<String> {
        Ok("alice".to_string())
    }

    async fn generate_password(&self) -> dbcreds_backend::Result<String> {
        Ok("p@ss".to_string())
    }

    async fn generate_expiration(&self, _: Duration) -> dbcreds_backend::Result<String> {
        Ok("2024-01-01T00:00:00Z".to_string())
    }
}

struct CountingProcess(Arc<AtomicUsize>);

#[async_trait]
impl PluginProcess for CountingProcess {
    async fn terminate(&mut self) -> std::io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============ Host side ============

struct InMemoryPluginFactory {
    backend: StubBackend,
    spawned: AtomicUsize,
    terminated: Arc<AtomicUsize>,
}

#[async_trait]
impl BackendFactory for InMemoryPluginFactory {
    async fn create(
        &self,
        _: &DatabaseConfig,
    ) -> dbcreds_backend::Result<Arc<dyn DatabaseBackend>> {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        let (host_io, plugin_io) = tokio::io::duplex(64 * 1024);

        let backend = self.backend.clone();
        tokio::spawn(async move {
            let (reader, writer) = tokio::io::split(plugin_io);
            PluginServer::new(backend)
                .serve_connection(reader, writer, &DATABASE_PLUGIN_HANDSHAKE)
                .await
        });

        let (reader, writer) = tokio::io::split(host_io);
        let client = PluginClient::connect_over(
            reader,
            writer,
            Box::new(CountingProcess(self.terminated.clone())),
            &DATABASE_PLUGIN_HANDSHAKE,
            "stub",
        )
        .await?;
        Ok(Arc::new(client))
    }
}

struct FixedStorage {
    roles: HashMap<String, Role>,
    databases: HashMap<String, DatabaseConfig>,
}

#[async_trait]
impl Storage for FixedStorage {
    async fn get_role(&self, name: &str) -> CoreResult<Option<Role>> {
        Ok(self.roles.get(name).cloned())
    }

    async fn get_database_config(&self, name: &str) -> CoreResult<Option<DatabaseConfig>> {
        Ok(self.databases.get(name).cloned())
    }
}

fn setup(backend: StubBackend) -> (CredentialService, Arc<InMemoryPluginFactory>, Arc<ServiceContext>) {
    let role = Role {
        name: "readonly".to_string(),
        db_name: "app".to_string(),
        default_ttl: Duration::from_secs(1800),
        max_ttl: None,
        statements: Statements {
            creation: "CREATE USER {{name}} WITH PASSWORD {{password}}".to_string(),
            ..Default::default()
        },
    };
    let config: DatabaseConfig = serde_json::from_value(json!({
        "type": "plugin",
        "connection_details": {"plugin_command": "dbcreds-plugin-stub"},
        "allowed_roles": ["readonly"]
    }))
    .unwrap();

    let storage = Arc::new(FixedStorage {
        roles: HashMap::from([("readonly".to_string(), role)]),
        databases: HashMap::from([("app".to_string(), config)]),
    });
    let factory = Arc::new(InMemoryPluginFactory {
        backend,
        spawned: AtomicUsize::new(0),
        terminated: Arc::new(AtomicUsize::new(0)),
    });
    let ctx = Arc::new(ServiceContext::new(
        storage,
        factory.clone(),
        Arc::new(BackendCache::new()),
    ));
    (CredentialService::new(ctx.clone()), factory, ctx)
}

#[tokio::test]
async fn test_issue_over_plugin_channel() {
    let backend = StubBackend::default();
    let created = backend.created.clone();
    let (svc, factory, ctx) = setup(backend);

    let issued = svc.issue("readonly", "token").await.unwrap();
    assert_eq!(issued.payload.username, "alice");
    assert_eq!(issued.payload.password, "p@ss");
    assert_eq!(
        issued.metadata,
        LeaseMetadata {
            username: "alice".to_string(),
            role: "readonly".to_string(),
        }
    );
    assert_eq!(issued.ttl, Duration::from_secs(1800));
    assert_eq!(
        created.lock().unwrap().clone(),
        vec![(
            "alice".to_string(),
            "p@ss".to_string(),
            "2024-01-01T00:00:00Z".to_string()
        )]
    );

    // second request reuses the plugin
    svc.issue("readonly", "token").await.unwrap();
    assert_eq!(factory.spawned.load(Ordering::SeqCst), 1);

    let backend = ctx.cache.get("app").await.unwrap();
    assert_eq!(backend.backend_type().await.unwrap(), "plugin-stub");

    ctx.cache.close_all().await;
    assert_eq!(factory.terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_create_failure_is_operation_error() {
    let (svc, factory, _) = setup(StubBackend {
        fail_create: true,
        ..Default::default()
    });

    let err = svc.issue("readonly", "token").await.unwrap_err();
    match err {
        CoreError::BackendOperation { operation, source } => {
            assert_eq!(operation, "CreateUser");
            assert!(!source.is_transport());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(factory.terminated.load(Ordering::SeqCst), 0);
}
