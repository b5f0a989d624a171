//! Newline-delimited JSON framing
//!
//! A frame is one compact JSON object followed by a single `\n`. JSON string
//! escaping never produces a raw newline, so splitting on `\n` always finds
//! frame boundaries.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::FrameDecodeError;

/// Byte that terminates every frame
pub const FRAME_DELIMITER: u8 = b'\n';

/// Content type of a frame stream
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Encode one value as a complete frame
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(128);
    encode_into(value, &mut buf)?;
    Ok(buf)
}

/// Append one frame to `buf`.
///
/// On error `buf` is left as it was.
pub fn encode_into<T: Serialize>(value: &T, buf: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    let start = buf.len();
    if let Err(e) = serde_json::to_writer(&mut *buf, value) {
        buf.truncate(start);
        return Err(e);
    }
    buf.push(FRAME_DELIMITER);
    Ok(())
}

/// Decode a single frame from text
///
/// Surrounding whitespace, including the terminator, is ignored.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, FrameDecodeError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Decode a single frame from raw bytes
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, FrameDecodeError> {
    let text = std::str::from_utf8(line.trim_ascii())?;
    decode(text)
}
