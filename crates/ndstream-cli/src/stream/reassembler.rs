//! Chunk reassembly
//!
//! Transport chunks arrive with arbitrary boundaries. The reassembler keeps
//! the bytes after the last newline as a pending partial frame and decodes
//! every complete line before it. Splitting happens on raw bytes, so a
//! multi-byte UTF-8 character cut in half by the transport is rejoined before
//! anything is decoded.

use ndstream_common::{frame, frame::FRAME_DELIMITER, Record};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::warn;

/// Incremental NDJSON frame decoder
#[derive(Debug)]
pub struct ChunkReassembler<T = Record> {
    buffer: Vec<u8>,
    /// Offset of the first byte not yet consumed as part of a frame
    consumed: usize,
    /// Bytes before this offset hold no delimiter past `consumed`
    scanned: usize,
    decoded: u64,
    skipped: u64,
    _frame: PhantomData<fn() -> T>,
}

impl<T> Default for ChunkReassembler<T> {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            consumed: 0,
            scanned: 0,
            decoded: 0,
            skipped: 0,
            _frame: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> ChunkReassembler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and iterate the frames it completes.
    ///
    /// Frames not pulled from the iterator before it is dropped stay buffered
    /// and come out of the next `feed` or `finish`.
    pub fn feed(&mut self, chunk: &[u8]) -> Frames<'_, T> {
        self.buffer.extend_from_slice(chunk);
        Frames { reassembler: self }
    }

    /// End of stream: the residue, if any, is the last frame.
    pub fn finish(mut self) -> IntoFrames<T> {
        if self.buffer[self.consumed..]
            .last()
            .is_some_and(|b| *b != FRAME_DELIMITER)
        {
            self.buffer.push(FRAME_DELIMITER);
        }
        IntoFrames { reassembler: self }
    }

    /// Frames decoded so far
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Malformed frames skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Bytes held back waiting for more input
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.consumed
    }

    fn next_frame(&mut self) -> Option<T> {
        loop {
            let from = self.scanned.max(self.consumed);
            let Some(offset) = self.buffer[from..]
                .iter()
                .position(|b| *b == FRAME_DELIMITER)
            else {
                self.scanned = self.buffer.len();
                return None;
            };
            let start = self.consumed;
            let end = from + offset;
            self.consumed = end + 1;
            self.scanned = self.consumed;

            let line = &self.buffer[start..end];
            if line.trim_ascii().is_empty() {
                continue;
            }

            match frame::decode_line::<T>(line) {
                Ok(value) => {
                    self.decoded += 1;
                    return Some(value);
                },
                Err(e) => {
                    self.skipped += 1;
                    warn!(
                        error = %e,
                        frame_len = line.len(),
                        skipped = self.skipped,
                        "Skipping malformed frame"
                    );
                },
            }
        }
    }

    fn compact(&mut self) {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.scanned = self.scanned.saturating_sub(self.consumed);
            self.consumed = 0;
        }
    }
}

/// Frames completed by one [`ChunkReassembler::feed`] call
pub struct Frames<'a, T: DeserializeOwned> {
    reassembler: &'a mut ChunkReassembler<T>,
}

impl<T: DeserializeOwned> Iterator for Frames<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.reassembler.next_frame()
    }
}

impl<T: DeserializeOwned> Drop for Frames<'_, T> {
    fn drop(&mut self) {
        self.reassembler.compact();
    }
}

/// Remaining frames once the transport has closed
pub struct IntoFrames<T: DeserializeOwned> {
    reassembler: ChunkReassembler<T>,
}

impl<T: DeserializeOwned> IntoFrames<T> {
    pub fn skipped(&self) -> u64 {
        self.reassembler.skipped
    }
}

impl<T: DeserializeOwned> Iterator for IntoFrames<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.reassembler.next_frame()
    }
}
