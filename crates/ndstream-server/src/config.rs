//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::pacing::{PacePolicy, DEFAULT_CHUNK_SIZE, DEFAULT_PACE_DELAY_MS};
use crate::source::DEFAULT_TOTAL_RECORDS;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default upper bound for the `limit` query parameter.
pub const DEFAULT_MAX_LIMIT: u64 = 10_000_000;

/// Default capacity, in flushed chunks, of the channel feeding a response body.
pub const DEFAULT_BODY_CHANNEL_CAPACITY: usize = 4;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub stream: StreamConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Streaming endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Records between explicit flushes
    pub chunk_size: usize,
    /// Pause after each flush, in milliseconds
    pub pace_delay_ms: u64,
    /// Records produced by the generated source
    pub total_records: u64,
    /// Largest `limit` a request may ask for
    pub max_limit: u64,
    pub body_channel_capacity: usize,
}

impl StreamConfig {
    /// Pace policy built from the configured defaults
    pub fn pace_policy(&self) -> anyhow::Result<PacePolicy> {
        Ok(PacePolicy::new(
            self.chunk_size,
            Duration::from_millis(self.pace_delay_ms),
        )?)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("NDSTREAM_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("NDSTREAM_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "NDSTREAM_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            stream: StreamConfig {
                chunk_size: env_or("NDSTREAM_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
                pace_delay_ms: env_or("NDSTREAM_PACE_DELAY_MS", DEFAULT_PACE_DELAY_MS),
                total_records: env_or("NDSTREAM_TOTAL_RECORDS", DEFAULT_TOTAL_RECORDS),
                max_limit: env_or("NDSTREAM_MAX_LIMIT", DEFAULT_MAX_LIMIT),
                body_channel_capacity: env_or(
                    "NDSTREAM_BODY_CHANNEL_CAPACITY",
                    DEFAULT_BODY_CHANNEL_CAPACITY,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.stream.chunk_size == 0 {
            anyhow::bail!("Stream chunk_size must be greater than 0");
        }

        if self.stream.body_channel_capacity == 0 {
            anyhow::bail!("Stream body_channel_capacity must be greater than 0");
        }

        if self.stream.max_limit == 0 {
            anyhow::bail!("Stream max_limit must be greater than 0");
        }

        if self.stream.pace_delay_ms == 0 {
            tracing::warn!("Pace delay is 0 - records will be streamed as fast as possible");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            stream: StreamConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                pace_delay_ms: DEFAULT_PACE_DELAY_MS,
                total_records: DEFAULT_TOTAL_RECORDS,
                max_limit: DEFAULT_MAX_LIMIT,
                body_channel_capacity: DEFAULT_BODY_CHANNEL_CAPACITY,
            },
        }
    }
}
