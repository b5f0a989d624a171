//! Stream feature module
//!
//! Serves the record source as a paced NDJSON response.

pub mod routes;

pub use routes::{stream_routes, StreamQuery, SESSION_HEADER};
