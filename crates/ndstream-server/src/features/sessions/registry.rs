//! Registry of in-flight stream sessions

use chrono::{DateTime, Utc};
use ndstream_common::{SessionState, StreamSession};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Public view of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub state: SessionState,
    pub records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl From<&StreamSession> for SessionSummary {
    fn from(session: &StreamSession) -> Self {
        let status = session.status();
        Self {
            id: session.id(),
            state: status.state,
            records: status.records,
            message: status.message,
            started_at: session.started_at(),
        }
    }
}

/// Sessions currently streaming, keyed by id
///
/// Sessions share no mutable state with each other; the registry only holds
/// handles so they can be listed.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Arc<StreamSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<StreamSession>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Track `session` until the returned guard is dropped
    pub fn register(&self, session: Arc<StreamSession>) -> RegistrationGuard {
        let id = session.id();
        self.lock().insert(id, session);
        RegistrationGuard {
            registry: self.clone(),
            id,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<StreamSession>> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summaries ordered by start time
    pub fn snapshot(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .lock()
            .values()
            .map(|session| SessionSummary::from(session.as_ref()))
            .collect();
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }
}

/// Removes its session from the registry on drop
pub struct RegistrationGuard {
    registry: SessionRegistry,
    id: Uuid,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
