//! ndstream server - main entry point

use anyhow::Result;
use ndstream_common::logging::{init_logging, LogConfig};
use ndstream_server::{api, config::Config};
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("ndstream-server")
        .filter_directives("ndstream_server=debug,tower_http=debug")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_over(log_config)?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting ndstream server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let timeout_secs = config.server.shutdown_timeout_secs;
    api::serve(config, shutdown_signal(timeout_secs)).await?;

    info!("Server shut down gracefully");

    Ok(())
}

async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Live streams are cancelled once this returns; the drain is bounded below
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Shutdown timeout elapsed, exiting");
        std::process::exit(0);
    });
}
