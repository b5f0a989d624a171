//! Paced stream writer
//!
//! Pulls records from a cursor, encodes each one as a frame and appends it to
//! a [`FrameSink`]. Every `chunk_size` records the sink is flushed explicitly
//! and the writer pauses for the policy delay. The loop ends when the cursor
//! is exhausted, the sink fails, or the session token is cancelled, and it
//! concludes the session exactly once.
//!
//! Every suspension point (pulling a record, writing, flushing, the pace
//! delay) is raced against the cancellation token, so a consumer abort or a
//! server shutdown stops the loop promptly.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use ndstream_common::{frame, Result, StreamError, StreamSession};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::pacing::PacePolicy;
use crate::source::RecordCursor;

/// Number of records a writer delivered to its sink
pub type RecordsSent = u64;

/// Destination for encoded frames
#[async_trait]
pub trait FrameSink: Send {
    /// Append one frame to the sink's write buffer
    async fn write(&mut self, frame: Bytes) -> Result<()>;

    /// Push everything buffered so far to the consumer
    async fn flush(&mut self) -> Result<()>;

    /// Close after a successful transfer
    async fn close(&mut self) -> Result<()>;

    /// Close after a failed or cancelled transfer, discarding buffered frames
    async fn abort(&mut self) {
        let _ = self.close().await;
    }
}

#[async_trait]
impl<'a, T: FrameSink + ?Sized> FrameSink for &'a mut T {
    async fn write(&mut self, frame: Bytes) -> Result<()> {
        (**self).write(frame).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    async fn abort(&mut self) {
        (**self).abort().await
    }
}

/// Item type of a channel-fed response body
pub type BodyChunk = std::io::Result<Bytes>;

/// Sink feeding a streaming HTTP body through a bounded channel
///
/// Frames accumulate in a local buffer; each flush hands the buffer to the
/// body as a single chunk. One extra slot of the channel is held back for the
/// error that ends an aborted body, so the abort marker is delivered even when
/// a slow client has let the channel fill up.
///
/// A dropped receiver means the client went away. That is reported as
/// [`StreamError::Cancelled`], the same outcome as an explicit abort.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<BodyChunk>>,
    abort_slot: Option<mpsc::OwnedPermit<BodyChunk>>,
    buffer: BytesMut,
}

impl ChannelSink {
    /// Create a sink and the receiver for the response body.
    ///
    /// `capacity` is the number of flushed chunks that may queue up before
    /// the writer waits for the client.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BodyChunk>) {
        let (tx, rx) = mpsc::channel(capacity.max(1) + 1);
        let abort_slot = tx.clone().try_reserve_owned().ok();
        let sink = Self {
            tx: Some(tx),
            abort_slot,
            buffer: BytesMut::with_capacity(64 * 1024),
        };
        (sink, rx)
    }

    /// Resolves once the receiving end of the body has been dropped
    pub fn consumer_closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let tx = self.tx.clone();
        async move {
            if let Some(tx) = tx {
                tx.closed().await;
            }
        }
    }

    fn sender(&self) -> Result<&mpsc::Sender<BodyChunk>> {
        match self.tx {
            Some(ref tx) if !tx.is_closed() => Ok(tx),
            _ => Err(StreamError::Cancelled),
        }
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write(&mut self, frame: Bytes) -> Result<()> {
        self.sender()?;
        self.buffer.extend_from_slice(&frame);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.split().freeze();
        self.sender()?
            .send(Ok(chunk))
            .await
            .map_err(|_| StreamError::Cancelled)
    }

    async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.abort_slot = None;
        self.tx = None;
        Ok(())
    }

    async fn abort(&mut self) {
        self.buffer.clear();
        self.tx = None;
        if let Some(slot) = self.abort_slot.take() {
            // The body ends with an error, never with a clean EOF
            let _ = slot.send(Err(std::io::Error::other("stream aborted by server")));
        }
    }
}

/// Sink over any tokio writer (files, sockets, in-memory buffers)
pub struct AsyncWriteSink<W: AsyncWrite + Unpin + Send> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin + Send> AsyncWriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Underlying writer; frames still buffered are dropped
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn classify_write_error(err: std::io::Error) -> StreamError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            StreamError::ConsumerGone
        },
        _ => StreamError::Io(err),
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for AsyncWriteSink<W> {
    async fn write(&mut self, frame: Bytes) -> Result<()> {
        self.writer.write_all(&frame).await.map_err(classify_write_error)
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(classify_write_error)
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(classify_write_error)
    }

    async fn abort(&mut self) {}
}

/// Drives one session's pull/encode/write loop
pub struct PacedStreamWriter {
    policy: PacePolicy,
    session: Arc<StreamSession>,
}

impl PacedStreamWriter {
    pub fn new(policy: PacePolicy, session: Arc<StreamSession>) -> Self {
        Self { policy, session }
    }

    pub fn session(&self) -> &Arc<StreamSession> {
        &self.session
    }

    /// Stream every record from `cursor` into `sink`
    #[instrument(skip_all, fields(session_id = %self.session.id()))]
    pub async fn run<C, S>(&self, mut cursor: C, mut sink: S) -> Result<RecordsSent>
    where
        C: RecordCursor,
        S: FrameSink,
    {
        let outcome = self.pump(&mut cursor, &mut sink).await;

        match outcome {
            Ok(sent) => {
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Sink close failed after completed stream");
                }
                info!(sent, "Stream completed");
            },
            Err(ref e) => {
                sink.abort().await;
                let sent = self.session.records();
                match e {
                    StreamError::Cancelled => info!(sent, "Stream cancelled"),
                    StreamError::ConsumerGone => info!(sent, "Consumer disconnected"),
                    _ => error!(sent, error = %e, "Stream failed"),
                }
            },
        }

        self.session.conclude(&outcome);
        outcome
    }

    async fn pump<C, S>(&self, cursor: &mut C, sink: &mut S) -> Result<RecordsSent>
    where
        C: RecordCursor,
        S: FrameSink,
    {
        let cancel = self.session.cancel_token();
        let mut sent: RecordsSent = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }

            let Some(record) = until_cancelled(cancel, cursor.next_record()).await? else {
                break;
            };

            let frame = Bytes::from(frame::encode(&record)?);
            until_cancelled(cancel, sink.write(frame)).await?;
            sent += 1;
            self.session.record_progress(1);

            if self.policy.is_flush_point(sent) {
                until_cancelled(cancel, sink.flush()).await?;
                debug!(sent, "Flushed chunk");
                self.policy.pause(cancel).await?;
            }
        }

        until_cancelled(cancel, sink.flush()).await?;
        Ok(sent)
    }
}

async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StreamError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::{GeneratedSource, MemorySource, RecordSource};
    use chrono::Utc;
    use ndstream_common::{Record, SessionState};
    use std::time::Duration;

    /// Records every sink call so tests can check the flush discipline
    #[derive(Default)]
    struct RecordingSink {
        pending: Vec<Bytes>,
        flushed: Vec<Vec<Bytes>>,
        writes: usize,
        closed: bool,
        aborted: bool,
        cancel_after: Option<(usize, CancellationToken)>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn delivered(&self) -> Vec<Record> {
            self.flushed
                .iter()
                .flatten()
                .map(|f| frame::decode_line(f).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl FrameSink for RecordingSink {
        async fn write(&mut self, frame: Bytes) -> Result<()> {
            if self.fail_after == Some(self.writes) {
                return Err(StreamError::ConsumerGone);
            }
            self.writes += 1;
            self.pending.push(frame);
            if let Some((n, ref token)) = self.cancel_after {
                if self.writes == n {
                    token.cancel();
                }
            }
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            if !self.pending.is_empty() {
                self.flushed.push(std::mem::take(&mut self.pending));
            }
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }

        async fn abort(&mut self) {
            self.aborted = true;
        }
    }

    fn writer(chunk_size: usize, delay: Duration) -> PacedStreamWriter {
        let policy = PacePolicy::new(chunk_size, delay).unwrap();
        PacedStreamWriter::new(policy, Arc::new(StreamSession::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_flushes_every_chunk_and_remainder() {
        let writer = writer(4, Duration::from_millis(500));
        let mut sink = RecordingSink::default();

        let sent = writer
            .run(GeneratedSource::new(10).open(), &mut sink)
            .await
            .unwrap();

        assert_eq!(sent, 10);
        let sizes: Vec<usize> = sink.flushed.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(sink.closed);
        assert!(!sink.aborted);

        let ids: Vec<i64> = sink.delivered().iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());

        let status = writer.session().status();
        assert_eq!(status.state, SessionState::Completed);
        assert_eq!(status.records, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_between_chunks() {
        let writer = writer(5, Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        writer
            .run(GeneratedSource::new(15).open(), RecordingSink::default())
            .await
            .unwrap();

        // One pause per full chunk: after records 5, 10 and 15
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_cancel_after_n_records_stops_writing() {
        let writer = writer(1000, Duration::ZERO);
        let token = writer.session().cancel_token().clone();
        let mut sink = RecordingSink {
            cancel_after: Some((250, token)),
            ..Default::default()
        };

        let err = writer
            .run(GeneratedSource::new(100_000).open(), &mut sink)
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(sink.writes, 250);
        // The partial chunk is never flushed
        assert!(sink.flushed.is_empty());
        assert!(sink.aborted);
        assert_eq!(writer.session().state(), SessionState::Cancelled);
        assert_eq!(writer.session().records(), 250);
    }

    #[tokio::test]
    async fn test_cancel_wakes_pace_delay() {
        let writer = writer(10, Duration::from_secs(3600));
        let token = writer.session().cancel_token().clone();

        let handle = tokio::spawn(async move {
            writer
                .run(GeneratedSource::new(1_000).open(), RecordingSink::default())
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("writer should wake from the pace delay")
            .unwrap();
        assert!(result.unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn test_write_failure_is_consumer_gone() {
        let writer = writer(3, Duration::ZERO);
        let mut sink = RecordingSink {
            fail_after: Some(7),
            ..Default::default()
        };

        let err = writer
            .run(GeneratedSource::new(100).open(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::ConsumerGone));
        assert_eq!(sink.writes, 7);
        assert!(sink.aborted);

        let status = writer.session().status();
        assert_eq!(status.state, SessionState::Error);
        assert_eq!(status.message.as_deref(), Some("Consumer disconnected"));
    }

    #[tokio::test]
    async fn test_non_finite_value_fails_the_stream() {
        let now = Utc::now();
        let source = MemorySource::new(vec![
            Record::new(1, "ok", 1.0, now),
            Record::new(2, "bad", f64::NAN, now),
        ]);
        let writer = writer(10, Duration::ZERO);
        let mut sink = RecordingSink::default();

        let err = writer.run(source.open(), &mut sink).await.unwrap_err();

        assert!(matches!(err, StreamError::Serialization(_)));
        assert_eq!(sink.writes, 1);
        assert!(sink.aborted);
        assert_eq!(writer.session().state(), SessionState::Error);
    }

    #[tokio::test]
    async fn test_already_cancelled_session_writes_nothing() {
        let writer = writer(10, Duration::ZERO);
        writer.session().cancel();
        let mut sink = RecordingSink::default();

        let err = writer
            .run(GeneratedSource::new(10).open(), &mut sink)
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(sink.writes, 0);
        assert_eq!(writer.session().state(), SessionState::Cancelled);
    }

    async fn drain(mut rx: mpsc::Receiver<BodyChunk>) -> Vec<BodyChunk> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_flushed_chunks() {
        let (sink, rx) = ChannelSink::channel(8);
        let writer = writer(2, Duration::ZERO);

        let sent = writer
            .run(GeneratedSource::new(5).open(), sink)
            .await
            .unwrap();
        assert_eq!(sent, 5);

        let lines: Vec<usize> = drain(rx)
            .await
            .into_iter()
            .map(|c| {
                c.unwrap()
                    .iter()
                    .filter(|b| **b == frame::FRAME_DELIMITER)
                    .count()
            })
            .collect();
        assert_eq!(lines, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_channel_sink_dropped_receiver_is_cancellation() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        let writer = writer(2, Duration::ZERO);

        let err = writer
            .run(GeneratedSource::new(5).open(), sink)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(writer.session().state(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn test_abort_with_full_channel_still_ends_in_error() {
        let (mut sink, rx) = ChannelSink::channel(1);

        sink.write(Bytes::from_static(b"{\"id\":1}\n")).await.unwrap();
        sink.flush().await.unwrap();
        // The data slot is now taken and nobody is reading
        sink.write(Bytes::from_static(b"{\"id\":2}\n")).await.unwrap();
        sink.abort().await;
        drop(sink);

        let oks: Vec<bool> = drain(rx).await.iter().map(std::result::Result::is_ok).collect();
        assert_eq!(oks, vec![true, false]);
    }

    #[tokio::test]
    async fn test_cancel_while_blocked_on_slow_client() {
        let (sink, rx) = ChannelSink::channel(1);
        let writer = writer(1, Duration::ZERO);
        let token = writer.session().cancel_token().clone();

        let handle = tokio::spawn(async move {
            let result = writer.run(GeneratedSource::new(100).open(), sink).await;
            (result, writer.session().state())
        });

        // Let the writer fill the channel and park on the next flush
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let (result, state) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("writer should stop on cancellation")
            .unwrap();
        assert!(result.unwrap_err().is_cancellation());
        assert_eq!(state, SessionState::Cancelled);

        let items = drain(rx).await;
        assert!(items.first().is_some_and(std::result::Result::is_ok));
        assert!(items.last().is_some_and(std::result::Result::is_err));
    }

    #[tokio::test]
    async fn test_completed_stream_ends_without_error_marker() {
        let (sink, rx) = ChannelSink::channel(1);
        let writer = writer(10, Duration::ZERO);

        let handle =
            tokio::spawn(async move { writer.run(GeneratedSource::new(3).open(), sink).await });
        let items = drain(rx).await;

        assert_eq!(handle.await.unwrap().unwrap(), 3);
        assert_eq!(items.len(), 1);
        assert!(items.iter().all(std::result::Result::is_ok));
    }

    #[tokio::test]
    async fn test_async_write_sink_into_memory() {
        let writer = writer(100, Duration::ZERO);
        let mut sink = AsyncWriteSink::new(Vec::new());

        writer
            .run(GeneratedSource::new(3).open(), &mut sink)
            .await
            .unwrap();

        let bytes = sink.into_inner();
        let records: Vec<Record> = bytes
            .split(|b| *b == frame::FRAME_DELIMITER)
            .filter(|l| !l.is_empty())
            .map(|l| frame::decode_line(l).unwrap())
            .collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].id, 3);
    }
}
