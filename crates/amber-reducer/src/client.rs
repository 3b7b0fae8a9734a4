//! Streaming client that keeps an [`IncidentBoard`] current.
//!
//! [`watch`] opens the relay's event stream, decodes frames as bytes arrive
//! (frames may straddle chunk boundaries), and folds each event into the
//! board. The callback sees the board after every event and decides whether
//! to keep listening.

use std::ops::ControlFlow;

use amber_types::{Event, FrameDecoder};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::board::{IncidentBoard, ReduceOutcome};

/// Errors that end a watch early.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request failed or the stream broke.
    #[error("event stream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("event stream returned HTTP {0}")]
    Status(u16),
}

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// The relay closed the stream.
    StreamClosed,
    /// The callback asked to stop.
    Stopped,
}

/// Subscribe to `url` and fold every event into `board`.
///
/// `on_event` runs after each decoded event with the event, what applying
/// it did, and the updated board. Frames that fail to decode are logged and
/// skipped.
///
/// # Errors
///
/// Returns [`ClientError`] if the connection cannot be made, the relay
/// answers with an error status, or the stream breaks mid-way.
pub async fn watch<F>(
    client: &reqwest::Client,
    url: &str,
    board: &mut IncidentBoard,
    mut on_event: F,
) -> Result<WatchEnd, ClientError>
where
    F: FnMut(&Event, &ReduceOutcome, &IncidentBoard) -> ControlFlow<()>,
{
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }
    info!(url, "event stream connected");

    let mut decoder = FrameDecoder::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        for decoded in decoder.push(&chunk) {
            let event = match decoded {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "skipping undecodable frame");
                    continue;
                }
            };
            let outcome = board.apply(&event);
            debug!(kind = %event.kind, ?outcome, "event applied");
            if on_event(&event, &outcome, board).is_break() {
                return Ok(WatchEnd::Stopped);
            }
        }
    }

    info!(url, pending = decoder.pending(), "event stream closed");
    Ok(WatchEnd::StreamClosed)
}
