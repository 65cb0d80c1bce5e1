//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dbcreds_backend::plugin::{HandshakeConfig, PluginClient, PluginProcess, PluginServer};
use dbcreds_backend::{BackendError, ConnectionDetails, DatabaseBackend, Result, Statements};
use tokio::task::JoinHandle;

/// 跳过测试的宏（当环境变量缺失时）
#[macro_export]
macro_rules! skip_if_no_env {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("跳过测试: 缺少环境变量 {}", $var);
                return;
            }
        )+
    };
}

/// 断言 `Result` 为 `Ok`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got Err({:?})", res.as_ref().err());
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: Err({:?})",
            format_args!($($msg)+),
            res.as_ref().err()
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

// ============ Recording backend ============

/// A created user as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedUser {
    pub statements: Statements,
    pub username: String,
    pub password: String,
    pub expiration: String,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub calls: Mutex<Vec<&'static str>>,
    pub created: Mutex<Vec<CreatedUser>>,
    pub initialized_with: Mutex<Option<ConnectionDetails>>,
}

impl Recorded {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreatedUser> {
        self.created.lock().unwrap().clone()
    }
}

/// Backend that records every call and answers with fixed values.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub recorded: Arc<Recorded>,
    pub close_error: Option<BackendError>,
    pub create_error: Option<BackendError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: &'static str) {
        self.recorded.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DatabaseBackend for RecordingBackend {
    async fn backend_type(&self) -> Result<String> {
        self.record("Type");
        Ok("recording".to_string())
    }

    async fn initialize(&self, details: &ConnectionDetails) -> Result<()> {
        self.record("Initialize");
        *self.recorded.initialized_with.lock().unwrap() = Some(details.clone());
        Ok(())
    }

    async fn create_user(
        &self,
        statements: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> Result<()> {
        self.record("CreateUser");
        if let Some(e) = &self.create_error {
            return Err(e.clone());
        }
        self.recorded.created.lock().unwrap().push(CreatedUser {
            statements: statements.clone(),
            username: username.to_string(),
            password: password.to_string(),
            expiration: expiration.to_string(),
        });
        Ok(())
    }

    async fn renew_user(&self, _: &Statements, _: &str, _: &str) -> Result<()> {
        self.record("RenewUser");
        Ok(())
    }

    async fn revoke_user(&self, _: &Statements, _: &str) -> Result<()> {
        self.record("RevokeUser");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record("Close");
        match &self.close_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn generate_username(&self, display_name: &str) -> Result<String> {
        self.record("GenerateUsername");
        Ok(format!("v-{display_name}"))
    }

    async fn generate_password(&self) -> Result<String> {
        self.record("GeneratePassword");
        Ok("p@ss".to_string())
    }

    async fn generate_expiration(&self, ttl: Duration) -> Result<String> {
        self.record("GenerateExpiration");
        Ok(format!("+{}s", ttl.as_secs()))
    }
}

// ============ Fake process ============

/// Process stand-in that counts terminations.
#[derive(Clone, Default)]
pub struct CountingProcess {
    pub terminations: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingProcess {
    pub fn count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginProcess for CountingProcess {
    async fn terminate(&mut self) -> std::io::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(std::io::Error::other("kill failed"))
        } else {
            Ok(())
        }
    }
}

// ============ In-memory plugin ============

pub struct InMemoryPlugin {
    pub client: Result<PluginClient>,
    pub process: CountingProcess,
    pub server: JoinHandle<Result<()>>,
}

/// Serve `backend` on one end of an in-memory pipe and connect a client to
/// the other end.
pub async fn connect_in_memory<B>(
    backend: B,
    host: HandshakeConfig,
    plugin: HandshakeConfig,
    process: CountingProcess,
) -> InMemoryPlugin
where
    B: DatabaseBackend + 'static,
{
    let (host_io, plugin_io) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(plugin_io);
        PluginServer::new(backend)
            .serve_connection(reader, writer, &plugin)
            .await
    });

    let (reader, writer) = tokio::io::split(host_io);
    let client =
        PluginClient::connect_over(reader, writer, Box::new(process.clone()), &host, "in-memory")
            .await;

    InMemoryPlugin {
        client,
        process,
        server,
    }
}
