//! Plugin process transport

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};

use crate::error::{BackendError, Result};
use crate::types::{ConnectionDetails, decode_details};

use super::client::PluginClient;
use super::handshake::HandshakeConfig;
use super::{BACKEND_NAME, transport_error};

/// How to launch a plugin, decoded from a configuration's connection details.
///
/// Only the `plugin_*` keys are read here; the whole details map is later
/// forwarded to the plugin through `Initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginRunner {
    #[serde(rename = "plugin_command")]
    pub command: String,
    #[serde(rename = "plugin_args", default)]
    pub args: Vec<String>,
    #[serde(rename = "plugin_env", default)]
    pub env: HashMap<String, String>,
}

impl PluginRunner {
    pub fn decode(details: &ConnectionDetails) -> Result<Self> {
        let runner: Self = decode_details(BACKEND_NAME, details)?;
        if runner.command.trim().is_empty() {
            return Err(BackendError::InvalidConfig {
                backend: BACKEND_NAME.to_string(),
                detail: "plugin_command must not be empty".to_string(),
            });
        }
        Ok(runner)
    }

    /// Short name used to prefix log lines.
    pub fn label(&self) -> String {
        Path::new(&self.command)
            .file_name()
            .map_or_else(|| self.command.clone(), |n| n.to_string_lossy().into_owned())
    }
}

/// The process on the far end of a plugin channel.
#[async_trait]
pub trait PluginProcess: Send {
    /// End the process unconditionally.
    async fn terminate(&mut self) -> std::io::Result<()>;
}

/// A spawned plugin executable.
pub struct ChildProcess {
    child: Child,
}

#[async_trait]
impl PluginProcess for ChildProcess {
    async fn terminate(&mut self) -> std::io::Result<()> {
        if let Some(status) = self.child.try_wait()? {
            log::debug!("[{BACKEND_NAME}] Process already exited with {status}");
            return Ok(());
        }
        self.child.kill().await
    }
}

/// Spawn the plugin, perform the handshake and return a client for it.
///
/// On handshake failure the process is terminated before the error is
/// returned.
pub async fn connect(runner: &PluginRunner, handshake: &HandshakeConfig) -> Result<PluginClient> {
    let label = runner.label();
    log::debug!("[{BACKEND_NAME} {label}] Spawning {}", runner.command);

    let mut child = Command::new(&runner.command)
        .args(&runner.args)
        .envs(&runner.env)
        .env(handshake.magic_cookie_key, handshake.magic_cookie_value)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| transport_error(format!("failed to start {}: {e}", runner.command)))?;

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        // kill_on_drop reaps the child
        return Err(transport_error("plugin stdio was not captured"));
    };
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(label.clone(), stderr);
    }

    PluginClient::connect_over(
        stdout,
        stdin,
        Box::new(ChildProcess { child }),
        handshake,
        label,
    )
    .await
}

/// Relay the plugin's stderr into the host log until the pipe closes.
fn forward_stderr(label: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => log::debug!("[{BACKEND_NAME} {label}] {line}"),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("[{BACKEND_NAME} {label}] stderr closed: {e}");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(value: serde_json::Value) -> ConnectionDetails {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn runner_from_details() {
        let runner = PluginRunner::decode(&details(json!({
            "plugin_command": "/opt/plugins/dbcreds-plugin-postgres",
            "plugin_args": ["--verbose"],
            "plugin_env": {"RUST_LOG": "debug"},
            "connection_url": "postgres://localhost/app"
        })))
        .unwrap();

        assert_eq!(runner.args, vec!["--verbose".to_string()]);
        assert_eq!(runner.env["RUST_LOG"], "debug");
        assert_eq!(runner.label(), "dbcreds-plugin-postgres");
    }

    #[test]
    fn runner_requires_command() {
        let err = PluginRunner::decode(&details(json!({"plugin_args": []}))).unwrap_err();
        assert!(err.is_config_error());

        let err = PluginRunner::decode(&details(json!({"plugin_command": ""}))).unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn missing_binary_is_transport_error() {
        let runner = PluginRunner {
            command: "/nonexistent/dbcreds-plugin-missing".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
        };
        let err = connect(&runner, &super::super::DATABASE_PLUGIN_HANDSHAKE)
            .await
            .err()
            .unwrap();
        assert!(err.is_transport());
    }
}
