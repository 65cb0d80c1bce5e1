//! RPC server stub, run inside the plugin process

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{BackendError, Result};
use crate::traits::DatabaseBackend;

use super::codec::{CodecError, read_frame, write_frame};
use super::envelope::{
    Call, Empty, GenerateExpirationResponse, GeneratePasswordResponse, GenerateUsernameResponse,
    Outcome, Reply, RequestEnvelope, ResponseEnvelope, TypeResponse,
};
use super::handshake::{DATABASE_PLUGIN_HANDSHAKE, HandshakeConfig, server_handshake};
use super::{BACKEND_NAME, transport_error};

/// Dispatches decoded calls into a backend implementation.
pub struct PluginServer<B> {
    backend: B,
}

impl<B: DatabaseBackend> PluginServer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Invoke the backend for one call and wrap its result.
    pub async fn dispatch(&self, call: Call) -> Outcome {
        let backend = &self.backend;
        let result = match call {
            Call::Type => backend
                .backend_type()
                .await
                .map(|backend_type| Reply::Type(TypeResponse { backend_type })),
            Call::Initialize(req) => backend
                .initialize(&req.connection_details)
                .await
                .map(|()| Reply::Empty(Empty {})),
            Call::CreateUser(req) => backend
                .create_user(&req.statements, &req.username, &req.password, &req.expiration)
                .await
                .map(|()| Reply::Empty(Empty {})),
            Call::RenewUser(req) => backend
                .renew_user(&req.statements, &req.username, &req.expiration)
                .await
                .map(|()| Reply::Empty(Empty {})),
            Call::RevokeUser(req) => backend
                .revoke_user(&req.statements, &req.username)
                .await
                .map(|()| Reply::Empty(Empty {})),
            Call::Close => backend.close().await.map(|()| Reply::Empty(Empty {})),
            Call::GenerateUsername(req) => backend
                .generate_username(&req.display_name)
                .await
                .map(|username| Reply::GenerateUsername(GenerateUsernameResponse { username })),
            Call::GeneratePassword => backend
                .generate_password()
                .await
                .map(|password| Reply::GeneratePassword(GeneratePasswordResponse { password })),
            Call::GenerateExpiration(req) => {
                backend.generate_expiration(req.ttl).await.map(|expiration| {
                    Reply::GenerateExpiration(GenerateExpirationResponse { expiration })
                })
            }
        };

        if let Err(e) = &result {
            if e.is_expected() {
                log::warn!("{e}");
            } else {
                log::error!("{e}");
            }
        }
        result.into()
    }

    /// Handshake, then answer calls until the host closes the channel or
    /// sends `Close`.
    pub async fn serve_connection<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
        handshake: &HandshakeConfig,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        server_handshake(&mut reader, &mut writer, handshake).await?;
        log::info!("[{BACKEND_NAME}] Handshake complete, serving");

        loop {
            let request: RequestEnvelope = match read_frame(&mut reader).await {
                Ok(request) => request,
                Err(CodecError::Closed) => {
                    log::info!("[{BACKEND_NAME}] Host closed the channel");
                    return Ok(());
                }
                Err(e) => return Err(transport_error(format!("receive failed: {e}"))),
            };

            let is_close = matches!(request.call, Call::Close);
            log::debug!("[{BACKEND_NAME}] <- {} #{}", request.call.method(), request.seq);

            let response = ResponseEnvelope {
                seq: request.seq,
                outcome: self.dispatch(request.call).await,
            };
            write_frame(&mut writer, &response)
                .await
                .map_err(|e| transport_error(format!("send failed: {e}")))?;

            if is_close {
                log::info!("[{BACKEND_NAME}] Closed by host");
                return Ok(());
            }
        }
    }
}

/// Serve `backend` over stdin/stdout.
///
/// Entry point for plugin executables. Refuses to run unless the host's
/// magic cookie is present in the environment, so starting the binary by
/// hand fails with an explanation instead of waiting on a terminal.
pub async fn serve<B: DatabaseBackend>(backend: B) -> Result<()> {
    let handshake = DATABASE_PLUGIN_HANDSHAKE;
    let cookie = std::env::var(handshake.magic_cookie_key).ok();
    if cookie.as_deref() != Some(handshake.magic_cookie_value) {
        return Err(BackendError::InvalidConfig {
            backend: BACKEND_NAME.to_string(),
            detail: "this binary is a database plugin and is meant to be launched by the \
                     credential service, not executed directly"
                .to_string(),
        });
    }

    PluginServer::new(backend)
        .serve_connection(tokio::io::stdin(), tokio::io::stdout(), &handshake)
        .await
}
