//! Tests for the API client and the consumer pipeline over real HTTP
//!
//! A mock server plays the producer; the tests drive `ApiClient` and
//! `stream::consume` the way `ndstream fetch` does.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use ndstream_cli::{
    api::{ApiClient, StreamParams},
    stream::{consume, Batch, CollectingSink},
    CliError,
};
use ndstream_common::{frame, Record, SessionState, StreamSession};
use std::time::Duration;
use uuid::Uuid;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn records(n: i64) -> Vec<Record> {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    (1..=n)
        .map(|id| Record::new(id, format!("Record {id}"), (id * 7919 % 100_000) as f64 / 100.0, created_at))
        .collect()
}

fn ndjson(records: &[Record]) -> Vec<u8> {
    let mut body = Vec::new();
    for record in records {
        frame::encode_into(record, &mut body).unwrap();
    }
    body
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_stream_2500_records_in_batches() {
    let mock_server = MockServer::start().await;
    let expected = records(2500);
    let session_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/records/stream"))
        .and(query_param("limit", "2500"))
        .and(header("accept", frame::NDJSON_CONTENT_TYPE))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-stream-session", session_id.to_string().as_str())
                .set_body_raw(ndjson(&expected), frame::NDJSON_CONTENT_TYPE),
        )
        .mount(&mock_server)
        .await;

    let params = StreamParams {
        limit: Some(2500),
        ..Default::default()
    };
    let stream = client(&mock_server).open_record_stream(&params).await.unwrap();
    assert_eq!(stream.session_id, Some(session_id));

    let session = StreamSession::new();
    let mut sink = CollectingSink::<Record>::default();
    let received = consume(stream.chunks, &session, 1000, &mut sink).await.unwrap();

    assert_eq!(received, 2500);
    let sizes: Vec<usize> = sink.batches.iter().map(Batch::len).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    assert_eq!(sink.into_records(), expected);
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_error_envelope_becomes_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/records/stream"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "success": false,
            "error": {
                "code": "validation_error",
                "message": "Validation error: chunk_size must be greater than 0"
            }
        })))
        .mount(&mock_server)
        .await;

    let params = StreamParams {
        chunk_size: Some(0),
        ..Default::default()
    };
    let err = client(&mock_server)
        .open_record_stream(&params)
        .await
        .unwrap_err();

    match err {
        CliError::Api(message) => {
            assert!(message.contains("chunk_size must be greater than 0"));
            assert!(message.contains("400"));
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server).health_check().await.unwrap_err();
    assert!(matches!(err, CliError::Api(ref m) if m.contains("503")));
}

#[tokio::test]
async fn test_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "healthy",
            "active_sessions": 0
        })))
        .mount(&mock_server)
        .await;

    let health = client(&mock_server).health_check().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_sessions, 0);
}

#[tokio::test]
async fn test_list_sessions() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": [{
                "id": id,
                "state": "connecting",
                "records": 0,
                "started_at": "2024-06-01T08:30:00Z"
            }],
            "meta": { "active": 1 }
        })))
        .mount(&mock_server)
        .await;

    let sessions = client(&mock_server).list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, id);
    assert_eq!(sessions[0].state, SessionState::Connecting);
    assert!(sessions[0].message.is_none());
}

#[tokio::test]
async fn test_cancelled_session_stops_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/records/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(ndjson(&records(10)), frame::NDJSON_CONTENT_TYPE),
        )
        .mount(&mock_server)
        .await;

    let stream = client(&mock_server)
        .open_record_stream(&StreamParams::default())
        .await
        .unwrap();

    let session = StreamSession::new();
    session.cancel();
    let mut sink = CollectingSink::<Record>::default();
    let err = consume(stream.chunks, &session, 1, &mut sink).await.unwrap_err();

    assert!(err.is_cancellation());
    assert!(sink.batches.is_empty());
    assert_eq!(session.state(), SessionState::Cancelled);
}
