//! Compatibility handshake
//!
//! The host opens the channel with a [`HandshakeRequest`]; the plugin checks
//! the magic cookie and protocol version and answers with a
//! [`HandshakeResponse`]. No operation call is exchanged unless both sides
//! agree. The cookie only keeps a plugin from being started by accident; it
//! is not access control.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

use super::codec::{read_frame, write_frame};
use super::transport_error;

/// Protocol parameters both sides must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub protocol_version: u32,
    pub magic_cookie_key: &'static str,
    pub magic_cookie_value: &'static str,
}

/// Handshake used by database plugins.
pub const DATABASE_PLUGIN_HANDSHAKE: HandshakeConfig = HandshakeConfig {
    protocol_version: 1,
    magic_cookie_key: "DBCREDS_DATABASE_PLUGIN",
    magic_cookie_value: "5c1e0b5b-0d9a-4d0e-9f3f-2f5f3c0b7a61",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub magic_cookie_key: String,
    pub magic_cookie_value: String,
    pub protocol_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub accepted: bool,
    pub protocol_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HandshakeConfig {
    fn request(&self) -> HandshakeRequest {
        HandshakeRequest {
            magic_cookie_key: self.magic_cookie_key.to_string(),
            magic_cookie_value: self.magic_cookie_value.to_string(),
            protocol_version: self.protocol_version,
        }
    }

    /// Why `request` is incompatible with this side, if it is.
    fn rejection(&self, request: &HandshakeRequest) -> Option<String> {
        if request.magic_cookie_key != self.magic_cookie_key
            || request.magic_cookie_value != self.magic_cookie_value
        {
            return Some("magic cookie mismatch".to_string());
        }
        if request.protocol_version != self.protocol_version {
            return Some(format!(
                "protocol version {} not supported (plugin speaks {})",
                request.protocol_version, self.protocol_version
            ));
        }
        None
    }
}

/// Host side: send our parameters and require an acceptance that echoes our
/// protocol version.
pub(crate) async fn client_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    config: &HandshakeConfig,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &config.request())
        .await
        .map_err(|e| transport_error(format!("handshake send failed: {e}")))?;

    let response: HandshakeResponse = read_frame(reader)
        .await
        .map_err(|e| transport_error(format!("handshake receive failed: {e}")))?;

    if !response.accepted {
        return Err(transport_error(format!(
            "handshake rejected by plugin: {}",
            response.reason.as_deref().unwrap_or("no reason given")
        )));
    }
    if response.protocol_version != config.protocol_version {
        return Err(transport_error(format!(
            "plugin answered with protocol version {}, expected {}",
            response.protocol_version, config.protocol_version
        )));
    }
    Ok(())
}

/// Plugin side: validate the host's parameters and answer.
pub(crate) async fn server_handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    config: &HandshakeConfig,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request: HandshakeRequest = read_frame(reader)
        .await
        .map_err(|e| transport_error(format!("handshake receive failed: {e}")))?;

    let rejection = config.rejection(&request);
    let response = HandshakeResponse {
        accepted: rejection.is_none(),
        protocol_version: config.protocol_version,
        reason: rejection.clone(),
    };
    write_frame(writer, &response)
        .await
        .map_err(|e| transport_error(format!("handshake send failed: {e}")))?;

    match rejection {
        Some(reason) => Err(transport_error(format!("handshake rejected: {reason}"))),
        None => Ok(()),
    }
}
