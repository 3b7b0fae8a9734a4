//! The broadcast hub.
//!
//! [`Hub`] keeps the set of live observer sinks and fans every published
//! event out to all of them. Delivery is best-effort: a sink that fails to
//! accept a frame is dropped after the fan-out completes, and the publisher
//! never waits on any sink.
//!
//! Sinks are abstract ([`EventSink`]). The SSE endpoint uses
//! [`ChannelSink`], a bounded channel whose receiving half feeds one HTTP
//! response stream; a full or closed channel counts as a failed delivery.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use amber_core::publisher::{EventPublisher, PublishReport};
use amber_types::{Event, SinkId, WireError, encode_payload};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a sink refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The sink's buffer is full.
    #[error("sink buffer is full")]
    Full,

    /// The receiving side has gone away.
    #[error("sink is closed")]
    Closed,
}

/// A live connection able to receive serialized events.
pub trait EventSink: Send + Sync {
    /// Hand one JSON payload to the sink without blocking.
    fn deliver(&self, payload: &str) -> Result<(), SinkError>;
}

/// Sink backed by a bounded [`mpsc`] channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink buffering up to `capacity` payloads, plus the receiver
    /// that drains it.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, payload: &str) -> Result<(), SinkError> {
        self.tx.try_send(payload.to_owned()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

type Sinks = BTreeMap<SinkId, Arc<dyn EventSink>>;

/// Registry of live sinks.
pub struct Hub {
    sinks: Mutex<Sinks>,
    sink_capacity: usize,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("subscribers", &self.subscriber_count())
            .field("sink_capacity", &self.sink_capacity)
            .finish()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Hub {
    /// Create an empty hub whose channel sinks buffer `sink_capacity`
    /// frames each.
    pub fn new(sink_capacity: usize) -> Self {
        Self {
            sinks: Mutex::new(BTreeMap::new()),
            sink_capacity: sink_capacity.max(1),
        }
    }

    /// Register `sink` and greet it with a `connected` event.
    ///
    /// The greeting goes to this sink only. A sink that refuses the greeting
    /// stays registered; the next broadcast it fails removes it.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) -> SinkId {
        let id = SinkId::new();
        let greeting = encode_payload(&Event::connected());

        let mut sinks = self.lock();
        match greeting {
            Ok(payload) => {
                if let Err(e) = sink.deliver(&payload) {
                    warn!(sink = %id, error = %e, "failed to send connected event");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode connected event"),
        }
        sinks.insert(id, sink);
        info!(sink = %id, subscribers = sinks.len(), "subscriber connected");
        id
    }

    /// Remove a sink. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SinkId) -> bool {
        let mut sinks = self.lock();
        let removed = sinks.remove(&id).is_some();
        if removed {
            info!(sink = %id, subscribers = sinks.len(), "subscriber disconnected");
        }
        removed
    }

    /// Open a [`ChannelSink`] subscription.
    ///
    /// The returned guard unsubscribes when dropped; the receiver yields
    /// JSON payloads, starting with the `connected` greeting.
    pub fn open_channel(self: &Arc<Self>) -> (Subscription, mpsc::Receiver<String>) {
        let (sink, rx) = ChannelSink::new(self.sink_capacity);
        let id = self.subscribe(Arc::new(sink));
        let guard = Subscription {
            hub: Arc::clone(self),
            id,
        };
        (guard, rx)
    }

    /// Number of registered sinks.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Serialize `event` once and offer it to every registered sink.
    ///
    /// Sinks that fail are removed after every sink has been tried. With
    /// no sinks registered this logs a warning and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] only if the event cannot be serialized.
    pub fn broadcast(&self, event: &Event) -> Result<PublishReport, WireError> {
        let payload = encode_payload(event)?;

        let mut sinks = self.lock();
        if sinks.is_empty() {
            warn!(kind = %event.kind, "no subscribers connected to event stream");
            return Ok(PublishReport::default());
        }

        let total = sinks.len();
        let failed: Vec<SinkId> = sinks
            .iter()
            .filter_map(|(id, sink)| match sink.deliver(&payload) {
                Ok(()) => None,
                Err(e) => {
                    debug!(sink = %id, error = %e, "delivery failed, dropping subscriber");
                    Some(*id)
                }
            })
            .collect();

        for id in &failed {
            sinks.remove(id);
        }

        let report = PublishReport {
            delivered: total.saturating_sub(failed.len()),
            removed: failed.len(),
        };
        info!(
            kind = %event.kind,
            delivered = report.delivered,
            total,
            "broadcast event"
        );
        Ok(report)
    }

    fn lock(&self) -> MutexGuard<'_, Sinks> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventPublisher for Hub {
    fn publish(&self, event: &Event) -> Result<PublishReport, WireError> {
        self.broadcast(event)
    }
}

/// Registration held by one stream; unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    hub: Arc<Hub>,
    id: SinkId,
}

impl Subscription {
    /// The registered sink id.
    pub const fn id(&self) -> SinkId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
