//! Sessions feature module
//!
//! Tracks every in-flight stream and exposes their live status.

pub mod registry;
pub mod routes;

pub use registry::{RegistrationGuard, SessionRegistry, SessionSummary};
pub use routes::sessions_routes;
