//! `ndstream sessions`: list streams in flight on the server

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::progress::format_count;
use colored::Colorize;
use ndstream_common::SessionState;

pub async fn run(config: &Config) -> Result<()> {
    let client = ApiClient::from_config(config)?;
    let sessions = client.list_sessions().await?;

    if sessions.is_empty() {
        println!("No active sessions.");
        return Ok(());
    }

    println!("{}", "Active Sessions:".cyan().bold());
    println!();

    for session in &sessions {
        let state = match session.state {
            SessionState::Error => session.state.to_string().red(),
            SessionState::Completed => session.state.to_string().green(),
            _ => session.state.to_string().yellow(),
        };
        println!("{}", session.id.to_string().bold());
        println!("  State:   {}", state);
        println!("  Records: {}", format_count(session.records));
        println!("  Started: {}", session.started_at.to_rfc3339());
        if let Some(message) = &session.message {
            println!("  Message: {}", message);
        }
        println!();
    }

    println!("Total: {}", sessions.len());
    Ok(())
}
