//! The seam between the scheduler and whatever fans events out.
//!
//! The scheduler only knows [`EventPublisher`]. The observer's hub
//! implements it for live delivery; [`RecordingPublisher`] captures events
//! with the instant they were published so timelines can be asserted.

use std::sync::{Mutex, PoisonError};

use amber_types::{Event, WireError};
use tokio::time::Instant;

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sinks that accepted the event.
    pub delivered: usize,
    /// Sinks removed because delivery failed.
    pub removed: usize,
}

/// Something events can be published through.
pub trait EventPublisher: Send + Sync {
    /// Deliver `event` to every current observer.
    ///
    /// Only serialization can fail; per-observer delivery failures are
    /// reported in [`PublishReport::removed`].
    fn publish(&self, event: &Event) -> Result<PublishReport, WireError>;
}

/// Publisher that keeps every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(Instant, Event)>>,
}

impl RecordingPublisher {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.entries().into_iter().map(|(_, e)| e).collect()
    }

    /// Events with the instant each was published.
    pub fn entries(&self) -> Vec<(Instant, Event)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events published so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &Event) -> Result<PublishReport, WireError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((Instant::now(), event.clone()));
        Ok(PublishReport {
            delivered: 1,
            removed: 0,
        })
    }
}
