//! ndstream CLI library
//!
//! Command-line consumer for the ndstream server.
//!
//! # Overview
//!
//! - **Fetching**: stream records as NDJSON to stdout or a file (`ndstream fetch`)
//! - **Health**: check the server is reachable (`ndstream health`)
//! - **Sessions**: list streams in flight on the server (`ndstream sessions`)
//!
//! The consumer pipeline lives in [`stream`] and is usable on its own: feed it
//! any stream of byte chunks and a [`stream::BatchSink`].

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod stream;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ndstream - paced NDJSON record streaming
#[derive(Parser, Debug)]
#[command(name = "ndstream")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(long, env = "NDSTREAM_SERVER_URL", global = true)]
    pub server_url: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream records from the server
    Fetch {
        /// Records per delivered batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Records between server flushes (server default if omitted)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Server pause after each flush, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<u64>,

        /// Write records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Receive and count records without writing them
        #[arg(long, conflicts_with = "output")]
        discard: bool,
    },

    /// Check server health
    Health,

    /// List streams in flight on the server
    Sessions,
}
