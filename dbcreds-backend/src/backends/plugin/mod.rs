//! Out-of-process backends
//!
//! A plugin is a separate executable that serves a [`DatabaseBackend`] over
//! its stdin/stdout. The host spawns it ([`connect`]), checks compatibility
//! with a handshake, and drives it through [`PluginClient`], which implements
//! the same trait as an in-process backend. Inside the plugin, [`serve`]
//! dispatches each call into the real implementation.
//!
//! [`DatabaseBackend`]: crate::DatabaseBackend

mod client;
pub mod codec;
pub mod envelope;
mod handshake;
mod server;
mod transport;

pub use client::PluginClient;
pub use handshake::{
    DATABASE_PLUGIN_HANDSHAKE, HandshakeConfig, HandshakeRequest, HandshakeResponse,
};
pub use server::{PluginServer, serve};
pub use transport::{ChildProcess, PluginProcess, PluginRunner, connect};

use crate::error::BackendError;

pub(crate) const BACKEND_NAME: &str = "plugin";

pub(crate) fn transport_error(detail: impl ToString) -> BackendError {
    BackendError::Transport {
        backend: BACKEND_NAME.to_string(),
        detail: detail.to_string(),
    }
}
