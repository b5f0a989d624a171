//! Session routes
//!
//! Read-only view of the transfers currently in flight.

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde_json::json;

use crate::api::response::ApiResponse;
use crate::features::FeatureState;

/// Create session routes
pub fn sessions_routes() -> Router<FeatureState> {
    Router::new().route("/", get(list_sessions))
}

/// List active sessions
///
/// GET /sessions
async fn list_sessions(State(state): State<FeatureState>) -> impl IntoResponse {
    let sessions = state.sessions.snapshot();
    let active = sessions.len();
    ApiResponse::success_with_meta(sessions, json!({ "active": active }))
}

