//! Batch aggregation
//!
//! Groups decoded records into bounded batches so the consumer updates once
//! per batch instead of once per record.

use ndstream_common::StreamError;

/// Default records per delivered batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A contiguous run of records, delivered in sequence order
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Position of this batch in the stream, starting at 0
    pub sequence: u64,
    pub records: Vec<T>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Accumulates records until `batch_size` is reached
#[derive(Debug)]
pub struct BatchAggregator<T> {
    batch_size: usize,
    pending: Vec<T>,
    next_sequence: u64,
}

impl<T> BatchAggregator<T> {
    pub fn new(batch_size: usize) -> Result<Self, StreamError> {
        if batch_size == 0 {
            return Err(StreamError::config("batch size must be greater than 0"));
        }
        Ok(Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
            next_sequence: 0,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Add one record; returns the batch it completes, if any
    pub fn accept(&mut self, item: T) -> Option<Batch<T>> {
        self.pending.push(item);
        if self.pending.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Hand over the non-empty remainder
    pub fn flush(&mut self) -> Option<Batch<T>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Batch<T> {
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Batch { sequence, records }
    }
}

impl<T> Default for BatchAggregator<T> {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pending: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            next_sequence: 0,
        }
    }
}

/// Externally owned consumer of batches
///
/// Batches arrive one at a time, in sequence order. An error ends the stream
/// as a failure.
pub trait BatchSink<T> {
    fn deliver(&mut self, batch: Batch<T>) -> Result<(), StreamError>;
}

impl<T, F> BatchSink<T> for F
where
    F: FnMut(Batch<T>) -> Result<(), StreamError>,
{
    fn deliver(&mut self, batch: Batch<T>) -> Result<(), StreamError> {
        self(batch)
    }
}

/// Sink that keeps every batch; handy for tests and small transfers
#[derive(Debug)]
pub struct CollectingSink<T> {
    pub batches: Vec<Batch<T>>,
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        Self {
            batches: Vec::new(),
        }
    }
}

impl<T> CollectingSink<T> {
    pub fn into_records(self) -> Vec<T> {
        self.batches.into_iter().flat_map(|b| b.records).collect()
    }
}

impl<T> BatchSink<T> for CollectingSink<T> {
    fn deliver(&mut self, batch: Batch<T>) -> Result<(), StreamError> {
        self.batches.push(batch);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn run(count: u32, batch_size: usize) -> Vec<Batch<u32>> {
        let mut aggregator = BatchAggregator::new(batch_size).unwrap();
        let mut batches: Vec<_> = (0..count).filter_map(|n| aggregator.accept(n)).collect();
        batches.extend(aggregator.flush());
        batches
    }

    #[test]
    fn test_2500_records_in_batches_of_1000() {
        let batches = run(2500, 1000);

        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let sequences: Vec<u64> = batches.iter().map(|b| b.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);

        let flat: Vec<u32> = batches.into_iter().flat_map(|b| b.records).collect();
        assert_eq!(flat, (0..2500).collect::<Vec<_>>());
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_batch() {
        let batches = run(2000, 1000);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_flush_empty() {
        let mut aggregator = BatchAggregator::<u32>::new(10).unwrap();
        assert!(aggregator.flush().is_none());
    }

    #[test]
    fn test_accept_returns_batch_at_threshold() {
        let mut aggregator = BatchAggregator::new(2).unwrap();
        assert!(aggregator.accept('a').is_none());
        assert_eq!(aggregator.pending_len(), 1);

        let batch = aggregator.accept('b').unwrap();
        assert_eq!(batch.records, vec!['a', 'b']);
        assert_eq!(aggregator.pending_len(), 0);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            BatchAggregator::<u32>::new(0),
            Err(StreamError::Config(_))
        ));
    }

    #[test]
    fn test_default_batch_size() {
        assert_eq!(BatchAggregator::<u32>::default().batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |batch: Batch<u32>| {
            seen.push(batch.sequence);
            Ok::<(), StreamError>(())
        };
        sink.deliver(Batch {
            sequence: 7,
            records: vec![1],
        })
        .unwrap();
        assert_eq!(seen, vec![7]);
    }
}
