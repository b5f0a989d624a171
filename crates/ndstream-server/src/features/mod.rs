//! Feature modules
//!
//! Each feature owns its routes; they all share [`FeatureState`].

pub mod sessions;
pub mod stream;

use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::source::RecordSource;
use sessions::SessionRegistry;

/// State shared by all feature handlers
#[derive(Clone)]
pub struct FeatureState {
    pub source: Arc<dyn RecordSource>,
    pub stream: Arc<StreamConfig>,
    pub sessions: SessionRegistry,
    /// Parent of every session token; cancelled on shutdown
    pub shutdown: CancellationToken,
}

impl FeatureState {
    pub fn new(source: Arc<dyn RecordSource>, stream: StreamConfig) -> Self {
        Self {
            source,
            stream: Arc::new(stream),
            sessions: SessionRegistry::new(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the feature router
pub fn router(state: FeatureState) -> Router {
    Router::new()
        .nest("/records", stream::stream_routes())
        .nest("/sessions", sessions::sessions_routes())
        .with_state(state)
}
