//! API client module
//!
//! HTTP client for the ndstream server.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ApiClient, RecordStream};
pub use types::*;
