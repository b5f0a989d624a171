//! API endpoint URL builders
//!
//! Helper functions to construct API endpoint URLs.

use super::types::StreamParams;

fn base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base(base_url))
}

/// Build record stream URL
pub fn record_stream_url(base_url: &str, params: &StreamParams) -> String {
    let mut query = Vec::new();

    if let Some(chunk_size) = params.chunk_size {
        query.push(format!("chunk_size={}", chunk_size));
    }

    if let Some(delay_ms) = params.delay_ms {
        query.push(format!("delay_ms={}", delay_ms));
    }

    if let Some(limit) = params.limit {
        query.push(format!("limit={}", limit));
    }

    let mut url = format!("{}/api/v1/records/stream", base(base_url));
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

/// Build session list URL
pub fn sessions_url(base_url: &str) -> String {
    format!("{}/api/v1/sessions", base(base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url() {
        assert_eq!(health_url("http://localhost:8000"), "http://localhost:8000/health");
        assert_eq!(health_url("http://localhost:8000/"), "http://localhost:8000/health");
    }

    #[test]
    fn test_record_stream_url_without_params() {
        assert_eq!(
            record_stream_url("http://localhost:8000", &StreamParams::default()),
            "http://localhost:8000/api/v1/records/stream"
        );
    }

    #[test]
    fn test_record_stream_url_with_params() {
        let params = StreamParams {
            chunk_size: Some(100),
            delay_ms: Some(0),
            limit: Some(2500),
        };
        assert_eq!(
            record_stream_url("http://localhost:8000", &params),
            "http://localhost:8000/api/v1/records/stream?chunk_size=100&delay_ms=0&limit=2500"
        );
    }

    #[test]
    fn test_sessions_url() {
        assert_eq!(
            sessions_url("http://localhost:8000"),
            "http://localhost:8000/api/v1/sessions"
        );
    }
}
