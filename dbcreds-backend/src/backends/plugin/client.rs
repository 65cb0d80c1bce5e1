//! RPC client stub
//!
//! [`PluginClient`] implements [`DatabaseBackend`] by sending each operation
//! as a [`Call`] over the plugin channel.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::traits::DatabaseBackend;
use crate::types::{ConnectionDetails, Statements};

use super::codec::{read_frame, write_frame};
use super::envelope::{
    Call, CreateUserRequest, GenerateExpirationRequest, GenerateExpirationResponse,
    GeneratePasswordResponse, GenerateUsernameRequest, GenerateUsernameResponse,
    InitializeRequest, Outcome, Reply, RenewUserRequest, RequestEnvelope, ResponseEnvelope,
    RevokeUserRequest, TypeResponse,
};
use super::handshake::{HandshakeConfig, client_handshake};
use super::transport::PluginProcess;
use super::{BACKEND_NAME, transport_error};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Channel {
    reader: BoxedReader,
    writer: BoxedWriter,
    next_seq: u64,
    /// Set after the first channel failure; later calls fail fast.
    broken: Option<String>,
}

impl Channel {
    async fn round_trip(&mut self, seq: u64, call: Call) -> std::result::Result<Outcome, String> {
        write_frame(&mut self.writer, &RequestEnvelope { seq, call })
            .await
            .map_err(|e| format!("send failed: {e}"))?;

        let response: ResponseEnvelope = read_frame(&mut self.reader)
            .await
            .map_err(|e| format!("receive failed: {e}"))?;

        if response.seq != seq {
            return Err(format!(
                "response sequence {} does not match request {seq}",
                response.seq
            ));
        }
        Ok(response.outcome)
    }
}

/// Host-side handle to a backend running in a plugin process.
///
/// One call is in flight at a time. A channel failure surfaces as
/// [`BackendError::Transport`](crate::BackendError::Transport) and poisons the
/// handle; an error returned by the remote backend is passed through as-is.
pub struct PluginClient {
    label: String,
    channel: Mutex<Channel>,
    process: Mutex<Option<Box<dyn PluginProcess>>>,
}

impl PluginClient {
    /// Run the handshake over an existing reader/writer pair.
    ///
    /// `process` is terminated if the handshake fails, and otherwise by
    /// [`close`](DatabaseBackend::close).
    pub async fn connect_over<R, W>(
        mut reader: R,
        mut writer: W,
        mut process: Box<dyn PluginProcess>,
        handshake: &HandshakeConfig,
        label: impl Into<String>,
    ) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let label = label.into();

        if let Err(e) = client_handshake(&mut reader, &mut writer, handshake).await {
            log::warn!("[{BACKEND_NAME} {label}] {e}");
            if let Err(kill_err) = process.terminate().await {
                log::error!("[{BACKEND_NAME} {label}] Failed to terminate process: {kill_err}");
            }
            return Err(e);
        }

        log::info!("[{BACKEND_NAME} {label}] Connected");
        Ok(Self {
            label,
            channel: Mutex::new(Channel {
                reader: Box::new(reader),
                writer: Box::new(writer),
                next_seq: 1,
                broken: None,
            }),
            process: Mutex::new(Some(process)),
        })
    }

    async fn call(&self, call: Call) -> Result<Reply> {
        let method = call.method();
        let mut channel = self.channel.lock().await;

        if let Some(reason) = &channel.broken {
            return Err(transport_error(format!("{method}: channel unusable ({reason})")));
        }

        let seq = channel.next_seq;
        channel.next_seq += 1;
        log::trace!("[{BACKEND_NAME} {}] -> {method} #{seq}", self.label);

        match channel.round_trip(seq, call).await {
            Ok(Outcome::Ok(reply)) => Ok(reply),
            Ok(Outcome::Err(e)) => Err(e),
            Err(detail) => {
                log::error!("[{BACKEND_NAME} {}] {method}: {detail}", self.label);
                channel.broken = Some(detail.clone());
                Err(transport_error(format!("{method}: {detail}")))
            }
        }
    }

    async fn call_empty(&self, call: Call) -> Result<()> {
        let method = call.method();
        match self.call(call).await? {
            Reply::Empty(_) => Ok(()),
            other => Err(unexpected_reply(method, &other)),
        }
    }

    async fn terminate_process(&self) {
        let Some(mut process) = self.process.lock().await.take() else {
            return;
        };
        match process.terminate().await {
            Ok(()) => log::debug!("[{BACKEND_NAME} {}] Process terminated", self.label),
            Err(e) => log::error!(
                "[{BACKEND_NAME} {}] Failed to terminate process: {e}",
                self.label
            ),
        }
    }
}

fn unexpected_reply(method: &str, reply: &Reply) -> crate::error::BackendError {
    transport_error(format!("{method}: unexpected reply {reply:?}"))
}

#[async_trait]
impl DatabaseBackend for PluginClient {
    async fn backend_type(&self) -> Result<String> {
        match self.call(Call::Type).await? {
            Reply::Type(TypeResponse { backend_type }) => Ok(format!("plugin-{backend_type}")),
            other => Err(unexpected_reply("Plugin.Type", &other)),
        }
    }

    async fn initialize(&self, details: &ConnectionDetails) -> Result<()> {
        self.call_empty(Call::Initialize(InitializeRequest {
            connection_details: details.clone(),
        }))
        .await
    }

    async fn create_user(
        &self,
        statements: &Statements,
        username: &str,
        password: &str,
        expiration: &str,
    ) -> Result<()> {
        self.call_empty(Call::CreateUser(CreateUserRequest {
            statements: statements.clone(),
            username: username.to_string(),
            password: password.to_string(),
            expiration: expiration.to_string(),
        }))
        .await
    }

    async fn renew_user(
        &self,
        statements: &Statements,
        username: &str,
        expiration: &str,
    ) -> Result<()> {
        self.call_empty(Call::RenewUser(RenewUserRequest {
            statements: statements.clone(),
            username: username.to_string(),
            expiration: expiration.to_string(),
        }))
        .await
    }

    async fn revoke_user(&self, statements: &Statements, username: &str) -> Result<()> {
        self.call_empty(Call::RevokeUser(RevokeUserRequest {
            statements: statements.clone(),
            username: username.to_string(),
        }))
        .await
    }

    /// Close the remote backend, then terminate the process.
    ///
    /// Termination happens even when the remote call fails; its own failure is
    /// only logged and the remote result is returned.
    async fn close(&self) -> Result<()> {
        let remote = self.call_empty(Call::Close).await;
        {
            let mut channel = self.channel.lock().await;
            if channel.broken.is_none() {
                channel.broken = Some("closed".to_string());
            }
        }
        self.terminate_process().await;
        remote
    }

    async fn generate_username(&self, display_name: &str) -> Result<String> {
        match self
            .call(Call::GenerateUsername(GenerateUsernameRequest {
                display_name: display_name.to_string(),
            }))
            .await?
        {
            Reply::GenerateUsername(GenerateUsernameResponse { username }) => Ok(username),
            other => Err(unexpected_reply("Plugin.GenerateUsername", &other)),
        }
    }

    async fn generate_password(&self) -> Result<String> {
        match self.call(Call::GeneratePassword).await? {
            Reply::GeneratePassword(GeneratePasswordResponse { password }) => Ok(password),
            other => Err(unexpected_reply("Plugin.GeneratePassword", &other)),
        }
    }

    async fn generate_expiration(&self, ttl: Duration) -> Result<String> {
        match self
            .call(Call::GenerateExpiration(GenerateExpirationRequest { ttl }))
            .await?
        {
            Reply::GenerateExpiration(GenerateExpirationResponse { expiration }) => Ok(expiration),
            other => Err(unexpected_reply("Plugin.GenerateExpiration", &other)),
        }
    }
}

impl std::fmt::Debug for PluginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginClient")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
