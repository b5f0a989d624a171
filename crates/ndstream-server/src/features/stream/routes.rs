//! Record stream route
//!
//! Each request gets its own session, cursor and writer task. The response
//! body is fed through a bounded channel, so a slow client holds back the
//! writer instead of growing a buffer.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use ndstream_common::{frame::NDJSON_CONTENT_TYPE, StreamSession};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::error::{AppError, AppResult};
use crate::features::FeatureState;
use crate::pacing::PacePolicy;
use crate::source::{RecordCursor, Take};
use crate::writer::{ChannelSink, PacedStreamWriter};

/// Response header carrying the session id
pub const SESSION_HEADER: &str = "x-stream-session";

/// Optional per-request overrides of the configured pacing
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub chunk_size: Option<usize>,
    pub delay_ms: Option<u64>,
    pub limit: Option<u64>,
}

impl StreamQuery {
    /// Resolve the pace policy against server defaults
    pub fn pace_policy(&self, defaults: &StreamConfig) -> AppResult<PacePolicy> {
        let chunk_size = self.chunk_size.unwrap_or(defaults.chunk_size);
        if chunk_size == 0 {
            return Err(AppError::validation("chunk_size must be greater than 0"));
        }
        let delay_ms = self.delay_ms.unwrap_or(defaults.pace_delay_ms);
        Ok(PacePolicy::new(chunk_size, Duration::from_millis(delay_ms))?)
    }

    pub fn validate_limit(&self, defaults: &StreamConfig) -> AppResult<()> {
        match self.limit {
            Some(limit) if limit > defaults.max_limit => Err(AppError::validation(format!(
                "limit must not exceed {}",
                defaults.max_limit
            ))),
            _ => Ok(()),
        }
    }
}

/// Create stream routes
pub fn stream_routes() -> Router<FeatureState> {
    Router::new().route("/stream", get(stream_records))
}

/// Stream records as NDJSON
///
/// GET /records/stream?chunk_size=&delay_ms=&limit=
async fn stream_records(
    State(state): State<FeatureState>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Response> {
    let policy = query.pace_policy(&state.stream)?;
    query.validate_limit(&state.stream)?;

    let session = Arc::new(StreamSession::child_of(&state.shutdown));
    let session_id = session.id();
    let registration = state.sessions.register(Arc::clone(&session));

    let cursor: Box<dyn RecordCursor> = match query.limit {
        Some(limit) => Box::new(Take::new(state.source.open(), limit)),
        None => state.source.open(),
    };

    let (sink, rx) = ChannelSink::channel(state.stream.body_channel_capacity);

    info!(
        session_id = %session_id,
        chunk_size = policy.chunk_size(),
        delay_ms = policy.delay().as_millis() as u64,
        limit = ?query.limit,
        source_records = ?state.source.size_hint(),
        "Opening record stream"
    );

    tokio::spawn(async move {
        let _registration = registration;
        let disconnect = sink.consumer_closed();
        let writer = PacedStreamWriter::new(policy, Arc::clone(&session));
        let run = writer.run(cursor, sink);
        tokio::pin!(run);

        // Dropping the response body drops the receiver. That is a client
        // abort: cancel the session so the writer stops at its next
        // suspension point and concludes as cancelled.
        tokio::select! {
            biased;
            _ = disconnect => {
                debug!(session_id = %session.id(), "Client went away");
                session.cancel();
                let _ = run.await;
            },
            _ = &mut run => {},
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .header(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        )
        .header(
            HeaderName::from_static(SESSION_HEADER),
            session_id.to_string(),
        )
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn defaults() -> StreamConfig {
        StreamConfig {
            chunk_size: 1000,
            pace_delay_ms: 500,
            total_records: 100,
            max_limit: 50,
            body_channel_capacity: 4,
        }
    }

    #[test]
    fn test_query_falls_back_to_defaults() {
        let policy = StreamQuery::default().pace_policy(&defaults()).unwrap();
        assert_eq!(policy.chunk_size(), 1000);
        assert_eq!(policy.delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_query_overrides() {
        let query = StreamQuery {
            chunk_size: Some(10),
            delay_ms: Some(0),
            limit: None,
        };
        let policy = query.pace_policy(&defaults()).unwrap();
        assert_eq!(policy.chunk_size(), 10);
        assert!(policy.delay().is_zero());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let query = StreamQuery {
            chunk_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            query.pace_policy(&defaults()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_limit_above_max_rejected() {
        let query = StreamQuery {
            limit: Some(51),
            ..Default::default()
        };
        assert!(query.validate_limit(&defaults()).is_err());

        let query = StreamQuery {
            limit: Some(50),
            ..Default::default()
        };
        assert!(query.validate_limit(&defaults()).is_ok());
    }
}
