//! `ndstream fetch`: stream records from the server
//!
//! Records are written to stdout (or `--output`) one batch at a time as
//! NDJSON. Status goes to stderr. Ctrl+C cancels the stream and exits
//! quietly.

use crate::api::{ApiClient, StreamParams};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::progress;
use crate::stream::{consume, Batch};
use colored::Colorize;
use indicatif::ProgressBar;
use ndstream_common::{frame, Record, SessionStatus, StreamError, StreamSession};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Options for a single fetch
#[derive(Debug, Clone, Default)]
pub struct FetchArgs {
    /// Overrides the configured batch size
    pub batch_size: Option<usize>,
    pub params: StreamParams,
    pub output: Option<PathBuf>,
    pub discard: bool,
}

struct Summary {
    received: u64,
    batches: u64,
    elapsed: Duration,
}

/// Run `ndstream fetch`
pub async fn run(config: &Config, args: FetchArgs) -> Result<()> {
    let batch_size = args.batch_size.unwrap_or(config.batch_size);
    if batch_size == 0 {
        return Err(CliError::config("--batch-size must be greater than 0"));
    }

    let client = ApiClient::from_config(config)?;
    let mut output = open_output(&args)?;

    let session = Arc::new(StreamSession::new());
    let interrupt = cancel_on_ctrl_c(Arc::clone(&session));

    let spinner = progress::create_spinner(&progress::status_message(&session.status()));
    let tracker = track_progress(session.subscribe(), spinner.clone());

    let result = stream_to_output(&client, &session, &args.params, batch_size, &mut output).await;

    interrupt.abort();
    // Every path above leaves the session terminal, which ends the tracker
    let _ = tracker.await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary, &args);
            Ok(())
        },
        Err(CliError::Stream(e)) if e.is_cancellation() => {
            debug!("Fetch cancelled");
            Ok(())
        },
        Err(e) => Err(e),
    }
}

async fn stream_to_output(
    client: &ApiClient,
    session: &StreamSession,
    params: &StreamParams,
    batch_size: usize,
    output: &mut Option<Box<dyn Write + Send>>,
) -> Result<Summary> {
    let started = Instant::now();

    let opened = tokio::select! {
        biased;
        _ = session.cancel_token().cancelled() => {
            session.mark_cancelled();
            return Err(StreamError::Cancelled.into());
        },
        opened = client.open_record_stream(params) => opened,
    };

    let stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            session.fail(e.to_string());
            return Err(e);
        },
    };
    if let Some(id) = stream.session_id {
        debug!(server_session = %id, "Record stream opened");
    }

    let mut batches = 0u64;
    let mut buf = Vec::new();
    let mut sink = |batch: Batch<Record>| -> std::result::Result<(), StreamError> {
        batches += 1;
        if let Some(out) = output.as_mut() {
            buf.clear();
            for record in &batch.records {
                frame::encode_into(record, &mut buf)?;
            }
            out.write_all(&buf)?;
            out.flush()?;
        }
        Ok(())
    };

    let received = consume(stream.chunks, session, batch_size, &mut sink).await?;

    Ok(Summary {
        received,
        batches,
        elapsed: started.elapsed(),
    })
}

fn open_output(args: &FetchArgs) -> Result<Option<Box<dyn Write + Send>>> {
    if args.discard {
        return Ok(None);
    }
    match &args.output {
        Some(path) => Ok(Some(Box::new(BufWriter::new(File::create(path)?)))),
        None => Ok(Some(Box::new(BufWriter::new(io::stdout())))),
    }
}

fn cancel_on_ctrl_c(session: Arc<StreamSession>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling stream");
            session.cancel();
        }
    })
}

fn track_progress(mut status: watch::Receiver<SessionStatus>, spinner: ProgressBar) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let current = status.borrow_and_update().clone();
            spinner.set_message(progress::status_message(&current));
            if current.state.is_terminal() || status.changed().await.is_err() {
                break;
            }
        }
    })
}

fn print_summary(summary: &Summary, args: &FetchArgs) {
    eprintln!(
        "{} Received {} records in {} batches ({:.1}s, {})",
        "✓".green(),
        progress::format_count(summary.received).bold(),
        summary.batches,
        summary.elapsed.as_secs_f64(),
        progress::format_rate(summary.received, summary.elapsed)
    );
    if let Some(path) = &args.output {
        eprintln!("  Written to {}", path.display().to_string().cyan());
    }
}
