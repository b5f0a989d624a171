pub mod response;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;
use crate::source::GeneratedSource;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Build the feature state from configuration, backed by the generated source
pub fn build_state(config: &Config) -> FeatureState {
    let source = Arc::new(GeneratedSource::new(config.stream.total_records));
    FeatureState::new(source, config.stream.clone())
}

/// Bind and serve until `shutdown` resolves
///
/// When `shutdown` resolves every live session is cancelled, so open streams
/// end promptly and the graceful drain does not wait on them.
pub async fn serve<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = build_state(&config);
    let sessions_token = state.shutdown.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            sessions_token.cancel();
        })
        .await?;

    Ok(())
}

pub fn create_router(state: FeatureState) -> Router {
    let api_v1 = features::router(state.clone());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", api_v1)
        .layer(middleware::tracing_layer())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "ndstream server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(state): State<FeatureState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.sessions.len()
    }))
}
