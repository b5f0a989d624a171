//! `ndstream health`: check that the server is up

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{CliError, Result};
use colored::Colorize;

pub async fn run(config: &Config) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let health = client.health_check().await?;

    if health.status != "healthy" {
        return Err(CliError::api(format!(
            "server at {} reports status '{}'",
            client.base_url(),
            health.status
        )));
    }

    println!("{} Server at {} is healthy", "✓".green(), client.base_url());
    println!("  Active sessions: {}", health.active_sessions);
    Ok(())
}
