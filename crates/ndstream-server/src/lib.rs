//! ndstream server library
//!
//! HTTP server that streams a record collection as paced NDJSON.
//!
//! # Overview
//!
//! - **Sources**: [`source::RecordSource`] hands each session its own cursor
//! - **Pacing**: [`pacing::PacePolicy`] decides when to flush and how long to pause
//! - **Writer**: [`writer::PacedStreamWriter`] pulls, encodes and writes one frame at a time
//! - **API**: `GET /api/v1/records/stream` and `GET /api/v1/sessions`
//!
//! Every session owns a cancellation token derived from the server's shutdown
//! token. A client disconnect cancels only that session; shutdown cancels all
//! of them.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;
pub mod pacing;
pub mod source;
pub mod writer;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use pacing::PacePolicy;
pub use source::{GeneratedSource, MemorySource, RecordCursor, RecordSource};
pub use writer::{ChannelSink, FrameSink, PacedStreamWriter};
