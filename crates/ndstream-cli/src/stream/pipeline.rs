//! Consumer-side pipeline: transport chunks to delivered batches

use bytes::Bytes;
use futures::{Stream, StreamExt};
use ndstream_common::{StreamError, StreamSession};
use serde::de::DeserializeOwned;
use std::fmt::Display;
use tracing::{debug, info, instrument, warn};

use super::aggregator::{BatchAggregator, BatchSink};
use super::reassembler::ChunkReassembler;

/// Read `chunks` to the end, delivering decoded records to `sink` in batches.
///
/// Every chunk read races the session's cancellation token. On cancellation
/// the transport is dropped immediately and nothing further is delivered.
/// The session is moved to its terminal state exactly once, from the
/// returned outcome.
#[instrument(skip_all, fields(session_id = %session.id(), batch_size = batch_size))]
pub async fn consume<T, S, E, K>(
    chunks: S,
    session: &StreamSession,
    batch_size: usize,
    sink: &mut K,
) -> Result<u64, StreamError>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    K: BatchSink<T> + ?Sized,
{
    let outcome = pump(chunks, session, batch_size, sink).await;

    match &outcome {
        Ok(received) => info!(received, "Stream completed"),
        Err(StreamError::Cancelled) => info!(received = session.records(), "Stream cancelled"),
        Err(e) => warn!(received = session.records(), error = %e, "Stream failed"),
    }

    session.conclude(&outcome);
    outcome
}

async fn pump<T, S, E, K>(
    chunks: S,
    session: &StreamSession,
    batch_size: usize,
    sink: &mut K,
) -> Result<u64, StreamError>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    K: BatchSink<T> + ?Sized,
{
    let cancel = session.cancel_token();
    let mut aggregator = BatchAggregator::new(batch_size)?;
    let mut reassembler = ChunkReassembler::<T>::new();
    let mut received: u64 = 0;

    let mut chunks = std::pin::pin!(chunks);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            next = chunks.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| StreamError::transport(e.to_string()))?;

        let (taken, delivered) =
            deliver_all(reassembler.feed(&chunk), &mut aggregator, session, sink);
        received += taken;
        delivered?;
    }

    if cancel.is_cancelled() {
        return Err(StreamError::Cancelled);
    }

    let mut tail = reassembler.finish();
    let (taken, delivered) = deliver_all(tail.by_ref(), &mut aggregator, session, sink);
    received += taken;
    delivered?;
    let skipped = tail.skipped();

    if cancel.is_cancelled() {
        return Err(StreamError::Cancelled);
    }
    if let Some(batch) = aggregator.flush() {
        debug!(sequence = batch.sequence, len = batch.len(), "Delivering final batch");
        sink.deliver(batch)?;
    }

    debug!(received, skipped, "Transport closed");
    Ok(received)
}

/// Feed decoded records to the aggregator and deliver each batch it completes.
///
/// Stops at the first delivery failure or cancellation. The count of records
/// taken is returned, and recorded on the session, either way.
fn deliver_all<T, K>(
    records: impl Iterator<Item = T>,
    aggregator: &mut BatchAggregator<T>,
    session: &StreamSession,
    sink: &mut K,
) -> (u64, Result<(), StreamError>)
where
    K: BatchSink<T> + ?Sized,
{
    let mut taken = 0;
    let mut outcome = Ok(());

    for record in records {
        taken += 1;
        if let Some(batch) = aggregator.accept(record) {
            if session.is_cancelled() {
                outcome = Err(StreamError::Cancelled);
                break;
            }
            debug!(sequence = batch.sequence, len = batch.len(), "Delivering batch");
            if let Err(e) = sink.deliver(batch) {
                outcome = Err(e);
                break;
            }
        }
    }

    if taken > 0 {
        session.record_progress(taken);
    }
    (taken, outcome)
}
