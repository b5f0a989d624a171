//! Configuration for the ndstream CLI
//!
//! Values come from the environment (and a `.env` file, if present);
//! command-line flags override them.

use crate::error::{CliError, Result};
use crate::stream::DEFAULT_BATCH_SIZE;
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default TCP connect timeout. There is no whole-request timeout, since a
/// stream may legitimately run for minutes.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub batch_size: usize,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("NDSTREAM_SERVER_URL") {
            config.server_url = url;
        }

        if let Ok(size) = std::env::var("NDSTREAM_BATCH_SIZE") {
            config.batch_size = size.parse().map_err(|_| {
                CliError::config(format!("NDSTREAM_BATCH_SIZE must be a positive integer, got '{size}'"))
            })?;
        }

        if let Ok(secs) = std::env::var("NDSTREAM_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = secs.parse().map_err(|_| {
                CliError::config(format!(
                    "NDSTREAM_CONNECT_TIMEOUT_SECS must be a number of seconds, got '{secs}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CliError::config("batch size must be greater than 0"));
        }
        if self.server_url.trim().is_empty() {
            return Err(CliError::config("server URL must not be empty"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
