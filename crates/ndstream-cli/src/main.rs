//! ndstream CLI - main entry point

use clap::Parser;
use ndstream_cli::{
    api::StreamParams,
    commands::{self, fetch::FetchArgs},
    config::Config,
    Cli, Commands,
};
use ndstream_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Records go to stdout, so logs always go to stderr
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Stderr)
        .log_file_prefix("ndstream-cli")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_over(log_config.clone()).unwrap_or(log_config);

    // The CLI works without logging, so init failures are ignored
    let _log_guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: Cli) -> ndstream_cli::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }

    match cli.command {
        Commands::Fetch {
            batch_size,
            chunk_size,
            delay_ms,
            limit,
            output,
            discard,
        } => {
            let args = FetchArgs {
                batch_size,
                params: StreamParams {
                    chunk_size,
                    delay_ms,
                    limit,
                },
                output,
                discard,
            };
            commands::fetch::run(&config, args).await
        },
        Commands::Health => commands::health::run(&config).await,
        Commands::Sessions => commands::sessions::run(&config).await,
    }
}
