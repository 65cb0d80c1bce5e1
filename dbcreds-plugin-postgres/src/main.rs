//! PostgreSQL database plugin
//!
//! Launched by the dbcreds host, never by hand: the host sets the handshake
//! cookie in the environment and talks the plugin protocol over
//! stdin/stdout. Logs go to stderr, which the host forwards into its own log.

use std::process::ExitCode;

use dbcreds_backend::plugin::serve;
use dbcreds_backend::PostgresBackend;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!(
        "Starting PostgreSQL database plugin v{}",
        env!("CARGO_PKG_VERSION")
    );

    match serve(PostgresBackend::new()).await {
        Ok(()) => {
            tracing::info!("Host closed the connection, exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Plugin stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
