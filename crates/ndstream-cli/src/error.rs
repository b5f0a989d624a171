//! Error types for the ndstream CLI
//!
//! Messages are user-facing and say what to try next.

use ndstream_common::StreamError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// The server answered with an error
    #[error("Server error: {0}. Check the request parameters and that the server is healthy ('ndstream health').")]
    Api(String),

    /// HTTP request failed before a response arrived
    #[error("Network request failed: {0}. Check that the server is running and the server URL is correct.")]
    Http(#[from] reqwest::Error),

    /// The stream ended in the error state
    #[error("Stream failed: {0}")]
    Stream(#[from] StreamError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or command-line flags.")]
    Config(String),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
