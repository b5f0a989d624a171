//! ndstream Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types and plumbing for streaming newline-delimited JSON records
//! from the ndstream server to its consumers.
//!
//! # Overview
//!
//! - **Records**: the [`Record`] data model carried on the wire
//! - **Frames**: one record per line, encoded and decoded by [`frame`]
//! - **Sessions**: the lifecycle and live status of one transfer ([`session`])
//! - **Error Handling**: the [`StreamError`] taxonomy shared by both ends
//! - **Logging**: `tracing` subscriber setup used by every binary
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use ndstream_common::{frame, Record};
//!
//! let record = Record::new(1, "Record 1", 12.5, Utc::now());
//! let bytes = frame::encode(&record).unwrap();
//! assert_eq!(bytes.last(), Some(&b'\n'));
//!
//! let line = std::str::from_utf8(&bytes).unwrap();
//! let decoded: Record = frame::decode(line).unwrap();
//! assert_eq!(decoded, record);
//! ```

pub mod error;
pub mod frame;
pub mod logging;
pub mod record;
pub mod session;

// Re-export commonly used types
pub use error::{FrameDecodeError, Result, StreamError};
pub use record::Record;
pub use session::{SessionState, SessionStatus, StreamSession};
