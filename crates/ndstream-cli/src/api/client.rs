//! HTTP API client for the ndstream server

use crate::api::{endpoints, types::*};
use crate::config::Config;
use crate::error::{CliError, Result};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use ndstream_common::frame::NDJSON_CONTENT_TYPE;
use reqwest::{header, Client, Response};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Response header carrying the server-side session id
pub const SESSION_HEADER: &str = "x-stream-session";

/// An opened record stream: response headers are in, the body is not
pub struct RecordStream {
    /// Server-side session id, if the server sent one
    pub session_id: Option<Uuid>,
    pub chunks: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// API client for the ndstream server
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Only connecting is bounded by `connect_timeout`; reads are not, since
    /// the stream endpoint is paced and may run for a long time.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.server_url.clone(), config.connect_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<HealthResponse> {
        let url = endpoints::health_url(&self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    /// Open the record stream and return once response headers arrive
    pub async fn open_record_stream(&self, params: &StreamParams) -> Result<RecordStream> {
        let url = endpoints::record_stream_url(&self.base_url, params);
        debug!(%url, "Opening record stream");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, NDJSON_CONTENT_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(NDJSON_CONTENT_TYPE) {
            warn!(content_type, "Unexpected content type for record stream");
        }

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());

        Ok(RecordStream {
            session_id,
            chunks: response.bytes_stream().boxed(),
        })
    }

    /// List sessions currently streaming on the server
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let url = endpoints::sessions_url(&self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api_response: ApiResponse<Vec<SessionInfo>> = response.json().await?;
        if !api_response.success {
            return Err(CliError::api("session listing was not successful"));
        }

        Ok(api_response.data)
    }
}

async fn error_from_response(response: Response) -> CliError {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => CliError::api(format!("{} (HTTP {})", body.error.message, status.as_u16())),
        Err(_) => CliError::api(format!("HTTP {}", status)),
    }
}
