//! Progress indicators for streaming
//!
//! The spinner draws on stderr, so it never mixes with NDJSON on stdout, and
//! indicatif hides it when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use ndstream_common::{SessionState, SessionStatus};
use std::time::Duration;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner text for a session status
pub fn status_message(status: &SessionStatus) -> String {
    match status.state {
        SessionState::Connecting => "Connecting...".to_string(),
        SessionState::Streaming => format!("Streaming - {} records received", format_count(status.records)),
        SessionState::Completed => format!("Completed - {} records", format_count(status.records)),
        SessionState::Cancelled => "Cancelled".to_string(),
        SessionState::Error => match &status.message {
            Some(message) => format!("Error - {}", message),
            None => "Error".to_string(),
        },
    }
}

/// Format a count with thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Records per second, guarded against a zero duration
pub fn format_rate(records: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        return "-".to_string();
    }
    format!("{} records/s", format_count((records as f64 / secs) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(100000), "100,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(2000, Duration::from_secs(2)), "1,000 records/s");
        assert_eq!(format_rate(10, Duration::ZERO), "-");
    }

    #[test]
    fn test_status_message() {
        let status = SessionStatus {
            state: SessionState::Streaming,
            records: 12000,
            message: None,
        };
        assert_eq!(status_message(&status), "Streaming - 12,000 records received");

        let status = SessionStatus {
            state: SessionState::Error,
            records: 5,
            message: Some("connection reset".to_string()),
        };
        assert_eq!(status_message(&status), "Error - connection reset");
    }

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner("Connecting...");
        pb.finish_and_clear();
    }
}
