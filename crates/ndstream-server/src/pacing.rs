//! Pace policy for the stream writer

use ndstream_common::{Result, StreamError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of records between explicit flushes
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default pause after each flush, in milliseconds
pub const DEFAULT_PACE_DELAY_MS: u64 = 500;

/// Flush every `chunk_size` records, then pause for `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacePolicy {
    chunk_size: usize,
    delay: Duration,
}

impl PacePolicy {
    pub fn new(chunk_size: usize, delay: Duration) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StreamError::config("chunk size must be greater than 0"));
        }
        Ok(Self { chunk_size, delay })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the writer should flush and pause after `sent` records
    pub fn is_flush_point(&self, sent: u64) -> bool {
        sent > 0 && sent % self.chunk_size as u64 == 0
    }

    /// Sleep for the pace delay, waking early with `Cancelled` if `cancel` fires
    pub async fn pause(&self, cancel: &CancellationToken) -> Result<()> {
        if self.delay.is_zero() {
            return if cancel.is_cancelled() {
                Err(StreamError::Cancelled)
            } else {
                Ok(())
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StreamError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

impl Default for PacePolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delay: Duration::from_millis(DEFAULT_PACE_DELAY_MS),
        }
    }
}
