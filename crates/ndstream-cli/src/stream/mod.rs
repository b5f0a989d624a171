//! Consumer side of a record stream
//!
//! Raw transport chunks go through the [`ChunkReassembler`], decoded records
//! are grouped by the [`BatchAggregator`], and whole batches are handed to a
//! caller-owned [`BatchSink`]. [`consume`] wires the three together for one
//! session.

pub mod aggregator;
pub mod pipeline;
pub mod reassembler;

pub use aggregator::{Batch, BatchAggregator, BatchSink, CollectingSink, DEFAULT_BATCH_SIZE};
pub use pipeline::consume;
pub use reassembler::ChunkReassembler;
