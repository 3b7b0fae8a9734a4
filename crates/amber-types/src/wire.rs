//! Text-event stream framing.
//!
//! Each event travels as one frame: `data: <json-object>` followed by a
//! blank line. The hub serializes an event once with [`encode_payload`] and
//! hands the payload to every sink; [`encode_frame`] produces the complete
//! frame for transports that write raw text.
//!
//! On the receiving side [`FrameDecoder`] accepts arbitrary byte chunks and
//! yields decoded events as frames complete. Comment lines (keep-alives)
//! and non-`data` fields are skipped.

use crate::event::Event;

/// Field prefix of a data line.
pub const DATA_FIELD: &str = "data:";

/// Default bound on bytes buffered while waiting for a frame terminator.
pub const DEFAULT_MAX_PENDING: usize = 1024 * 1024;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The JSON payload could not be produced or parsed.
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame was not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Unterminated input outgrew the decoder's buffer and was discarded.
    #[error("unterminated frame exceeded {limit} bytes ({pending} buffered), discarded")]
    Oversized {
        /// Bytes that were buffered.
        pending: usize,
        /// The configured bound.
        limit: usize,
    },
}

/// Serialize an event to its JSON payload.
pub fn encode_payload(event: &Event) -> Result<String, WireError> {
    Ok(serde_json::to_string(event)?)
}

/// Wrap an already-serialized payload in a frame.
pub fn frame(payload: &str) -> String {
    format!("{DATA_FIELD} {payload}\n\n")
}

/// Serialize an event into a complete frame.
pub fn encode_frame(event: &Event) -> Result<String, WireError> {
    encode_payload(event).map(|payload| frame(&payload))
}

/// Incremental decoder for a stream of frames.
///
/// Buffered input is bounded: once unterminated data exceeds the limit it
/// is dropped and reported as [`WireError::Oversized`].
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes received but not yet terminated by a blank line.
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a terminator.
    scanned: usize,
    max_pending: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create an empty decoder bounded by [`DEFAULT_MAX_PENDING`].
    pub const fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }

    /// Create an empty decoder that buffers at most `max_pending` bytes of
    /// an unterminated frame.
    pub const fn with_limit(max_pending: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_pending,
        }
    }

    /// Feed a chunk of bytes and return every event completed by it.
    ///
    /// Frames with empty data are dropped silently. A frame whose payload is
    /// not a valid event is returned as an error; decoding continues with
    /// the next frame.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Event, WireError>> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut decoded = Vec::new();
        // A terminator may straddle the previous scan boundary.
        let mut from = self.scanned.saturating_sub(1);
        while let Some(end) = find_frame_end(&self.buffer, from) {
            let block: Vec<u8> = self.buffer.drain(..end).collect();
            // Drop the blank-line separator.
            self.buffer.drain(..2.min(self.buffer.len()));
            from = 0;

            match std::str::from_utf8(&block) {
                Ok(text) => {
                    if let Some(payload) = data_of(text) {
                        decoded.push(serde_json::from_str(&payload).map_err(WireError::from));
                    }
                }
                Err(e) => decoded.push(Err(e.into())),
            }
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_pending {
            decoded.push(Err(WireError::Oversized {
                pending: self.buffer.len(),
                limit: self.max_pending,
            }));
            self.buffer.clear();
            self.scanned = 0;
        }
        decoded
    }

    /// Number of buffered bytes still waiting for a frame terminator.
    pub const fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Offset of the first `\n\n` in `buf` at or after `from`.
fn find_frame_end(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|pos| pos.saturating_add(from))
}
/// Join the `data` lines of one frame; `None` when there is nothing to parse.
fn data_of(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_FIELD))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
