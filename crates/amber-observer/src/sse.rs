//! Server-sent event stream of published events.
//!
//! Clients connect to `GET /api/events` and receive one `data: <json>`
//! frame per event, starting with a `connected` greeting. The connection
//! registers a channel sink with the hub; the sink is unsubscribed when the
//! client goes away and the response stream is dropped.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::Stream;
use tracing::debug;

use crate::state::AppState;

/// Open a long-lived event stream.
///
/// # Route
///
/// `GET /api/events`
pub async fn subscribe_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (subscription, rx) = state.hub.open_channel();
    debug!(sink = %subscription.id(), "event stream opened");

    // The subscription rides along in the stream state so dropping the
    // response unsubscribes the sink.
    let stream = futures::stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        let payload = rx.recv().await?;
        Some((Ok(SseEvent::default().data(payload)), (rx, subscription)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
