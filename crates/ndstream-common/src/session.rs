//! Stream session lifecycle
//!
//! A [`StreamSession`] spans one producer-to-consumer transfer. It owns the
//! cancellation token for the transfer, counts the records moved so far and
//! publishes a [`SessionStatus`] on a `watch` channel so that a progress
//! display, an HTTP handler or a test can observe it without polling.
//!
//! ```text
//! connecting ──first record──▶ streaming ──┬──▶ completed
//!      │                                   ├──▶ error
//!      └───────────────────────────────────┴──▶ cancelled
//! ```
//!
//! Terminal states are sticky: the first terminal transition wins and any
//! later one is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StreamError;

/// Lifecycle state of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connecting,
    Streaming,
    Completed,
    Error,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Error | SessionState::Cancelled
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Error => write!(f, "error"),
            SessionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Observable snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Records sent (producer) or received (consumer) so far
    pub records: u64,
    /// Failure message, only set in the `error` state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionStatus {
    fn connecting() -> Self {
        Self {
            state: SessionState::Connecting,
            records: 0,
            message: None,
        }
    }
}

/// State of one streaming transfer
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    records: AtomicU64,
    status: watch::Sender<SessionStatus>,
}

impl StreamSession {
    /// Create a session with its own root cancellation token
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a session that is also cancelled when `parent` is
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::with_token(parent.child_token())
    }

    fn with_token(cancel: CancellationToken) -> Self {
        let (status, _) = watch::channel(SessionStatus::connecting());
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            cancel,
            records: AtomicU64::new(0),
            status,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Token observed by every suspension point of the transfer
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signal abandonment.
    ///
    /// Only the token fires here; the running pipeline performs the
    /// `cancelled` transition once it has stopped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Count `n` more records and return the new total
    pub fn record_progress(&self, n: u64) -> u64 {
        let total = self.records.fetch_add(n, Ordering::Relaxed) + n;
        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = SessionState::Streaming;
            status.records = total;
            true
        });
        total
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Move to `completed`. Returns false if the session had already ended.
    pub fn complete(&self) -> bool {
        self.finish(SessionState::Completed, None)
    }

    /// Move to `error`. Returns false if the session had already ended.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.finish(SessionState::Error, Some(message.into()))
    }

    /// Move to `cancelled`. Returns false if the session had already ended.
    pub fn mark_cancelled(&self) -> bool {
        self.finish(SessionState::Cancelled, None)
    }

    /// Apply the terminal transition matching a pipeline outcome
    pub fn conclude(&self, outcome: &Result<u64, StreamError>) -> bool {
        match outcome {
            Ok(_) => self.complete(),
            Err(e) if e.is_cancellation() => self.mark_cancelled(),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn finish(&self, state: SessionState, message: Option<String>) -> bool {
        let records = self.records();
        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                return false;
            }
            status.state = state;
            status.records = records;
            status.message = message;
            true
        })
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
