//! Error types shared by the producer and consumer ends of a stream

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// A single line that could not be turned into a record.
///
/// Decode errors never end a stream: the reassembler logs them and moves on
/// to the next line.
#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Main error type for a streaming transfer
#[derive(Error, Debug)]
pub enum StreamError {
    /// Connection failure, reset, or a failed read on the consumer side
    #[error("Transport error: {0}")]
    Transport(String),

    /// The producer could not write because the consumer went away
    #[error("Consumer disconnected")]
    ConsumerGone,

    /// Consumer-initiated abort; never surfaced as a failure
    #[error("Stream cancelled")]
    Cancelled,

    #[error("Frame decode error: {0}")]
    Decode(#[from] FrameDecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a record source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is a consumer-initiated cancellation
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }

    /// Session state a transfer ends in when it terminates with this error
    pub fn terminal_state(&self) -> SessionState {
        if self.is_cancellation() {
            SessionState::Cancelled
        } else {
            SessionState::Error
        }
    }

    /// Stable label for logs and JSON bodies
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::Transport(_) => "transport_error",
            StreamError::ConsumerGone => "consumer_gone",
            StreamError::Cancelled => "cancelled",
            StreamError::Decode(_) => "frame_decode_error",
            StreamError::Serialization(_) => "serialization_error",
            StreamError::Source(_) => "source_error",
            StreamError::Io(_) => "io_error",
            StreamError::Config(_) => "config_error",
        }
    }
}
