//! Record sources
//!
//! A [`RecordSource`] is shared read-only by every session. Each session
//! opens its own [`RecordCursor`] and pulls records from it one at a time, so
//! nothing is materialized beyond the record currently in flight.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ndstream_common::{Record, Result};
use std::sync::Arc;

/// Default number of records produced by [`GeneratedSource`]
pub const DEFAULT_TOTAL_RECORDS: u64 = 100_000;

/// Shared producer of per-session cursors
pub trait RecordSource: Send + Sync {
    /// Start a new pass over the source, in the source's defined order
    fn open(&self) -> Box<dyn RecordCursor>;

    /// Number of records a full pass yields, if known
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// Pull-based iterator over one pass of a source
///
/// Implementations backed by I/O may suspend in `next_record`; the writer
/// races that call against the session's cancellation token.
#[async_trait]
pub trait RecordCursor: Send {
    /// Next record, or `None` once the pass is exhausted
    async fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Synthesizes `total` records on demand
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    total: u64,
}

impl GeneratedSource {
    pub fn new(total: u64) -> Self {
        Self { total }
    }
}

impl Default for GeneratedSource {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_RECORDS)
    }
}

impl RecordSource for GeneratedSource {
    fn open(&self) -> Box<dyn RecordCursor> {
        Box::new(GeneratedCursor {
            next_id: 1,
            total: self.total,
            epoch: Utc::now(),
        })
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

struct GeneratedCursor {
    next_id: u64,
    total: u64,
    epoch: DateTime<Utc>,
}

impl GeneratedCursor {
    fn build(&self, id: u64) -> Record {
        // Spread values over 0.00..=999.99 without a random source so passes
        // are reproducible.
        let value = ((id * 7_919) % 100_000) as f64 / 100.0;
        let id = id as i64;
        Record::new(
            id,
            format!("Record {id}"),
            value,
            self.epoch + Duration::milliseconds(id),
        )
    }
}

#[async_trait]
impl RecordCursor for GeneratedCursor {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        if self.next_id > self.total {
            return Ok(None);
        }
        let record = self.build(self.next_id);
        self.next_id += 1;
        Ok(Some(record))
    }
}

/// Serves a fixed, shared slice of records
#[derive(Debug, Clone)]
pub struct MemorySource {
    records: Arc<[Record]>,
}

impl MemorySource {
    pub fn new(records: impl Into<Arc<[Record]>>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl RecordSource for MemorySource {
    fn open(&self) -> Box<dyn RecordCursor> {
        Box::new(MemoryCursor {
            records: Arc::clone(&self.records),
            position: 0,
        })
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.records.len() as u64)
    }
}

struct MemoryCursor {
    records: Arc<[Record]>,
    position: usize,
}

#[async_trait]
impl RecordCursor for MemoryCursor {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        let record = self.records.get(self.position).cloned();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }
}

/// Caps a cursor at `limit` records
pub struct Take<C> {
    inner: C,
    remaining: u64,
}

impl<C> Take<C> {
    pub fn new(inner: C, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

#[async_trait]
impl<C: RecordCursor> RecordCursor for Take<C> {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let record = self.inner.next_record().await?;
        if record.is_some() {
            self.remaining -= 1;
        }
        Ok(record)
    }
}

#[async_trait]
impl RecordCursor for Box<dyn RecordCursor> {
    async fn next_record(&mut self) -> Result<Option<Record>> {
        (**self).next_record().await
    }
}
