//! The event entity and its typed kinds.
//!
//! An [`Event`] is the only unit of information that flows through the
//! system: the scheduler mints them, the hub fans them out, and observers
//! fold them into incident aggregates. The `type` field is an open set on
//! the wire, so [`EventKind`] names the conventional kinds and keeps any
//! other string as [`EventKind::Other`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::agent::{AgentPhase, SYSTEM};
use crate::ids::new_event_id;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The `type` of an event.
///
/// Serialized as its `snake_case` wire string. Unknown strings round-trip
/// through [`EventKind::Other`] unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Synthetic greeting sent to a single observer when it subscribes.
    Connected,
    /// The simulation was reset by an operator.
    SimulationReset,
    /// A new incident was reported.
    AlertReported,
    /// The analyzer assessed the incident.
    AlertAssessed,
    /// Public broadcast channels were activated.
    BroadcastInitiated,
    /// Search geofences were created.
    GeofenceCreated,
    /// Cameras began scanning the geofence.
    CameraScanning,
    /// A camera sweep finished without a hit.
    CameraScanComplete,
    /// A camera matched the suspect vehicle.
    SuspectDetected,
    /// A third-party tip arrived.
    TipReceived,
    /// A tip was scored by the tip processor.
    TipProcessed,
    /// The incident was resolved.
    AlertResolved,
    /// An agent failed (global, not tied to one incident).
    AgentFailed,
    /// A failed agent came back (global, not tied to one incident).
    AgentRecovered,
    /// Any other event type string.
    Other(String),
}

/// Every named kind, used to check the explicit classification table.
pub const KNOWN_KINDS: [EventKind; 14] = [
    EventKind::Connected,
    EventKind::SimulationReset,
    EventKind::AlertReported,
    EventKind::AlertAssessed,
    EventKind::BroadcastInitiated,
    EventKind::GeofenceCreated,
    EventKind::CameraScanning,
    EventKind::CameraScanComplete,
    EventKind::SuspectDetected,
    EventKind::TipReceived,
    EventKind::TipProcessed,
    EventKind::AlertResolved,
    EventKind::AgentFailed,
    EventKind::AgentRecovered,
];

impl EventKind {
    /// The wire string for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::SimulationReset => "simulation_reset",
            Self::AlertReported => "alert_reported",
            Self::AlertAssessed => "alert_assessed",
            Self::BroadcastInitiated => "broadcast_initiated",
            Self::GeofenceCreated => "geofence_created",
            Self::CameraScanning => "camera_scanning",
            Self::CameraScanComplete => "camera_scan_complete",
            Self::SuspectDetected => "suspect_detected",
            Self::TipReceived => "tip_received",
            Self::TipProcessed => "tip_processed",
            Self::AlertResolved => "alert_resolved",
            Self::AgentFailed => "agent_failed",
            Self::AgentRecovered => "agent_recovered",
            Self::Other(other) => other,
        }
    }

    /// System/control kinds that never belong to an incident.
    pub const fn is_control(&self) -> bool {
        matches!(self, Self::Connected | Self::SimulationReset)
    }

    /// Whether this kind closes an incident.
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::AlertResolved)
    }

    /// Agent failure/recovery kinds that apply to every tracked incident.
    pub const fn is_global_agent_event(&self) -> bool {
        matches!(self, Self::AgentFailed | Self::AgentRecovered)
    }

    /// The phase an originating agent moves to when it emits this kind.
    ///
    /// Named kinds use an explicit table. [`EventKind::Other`] falls back to
    /// [`classify_by_name`] so externally published kinds still classify.
    pub fn origin_phase(&self) -> AgentPhase {
        match self {
            Self::AgentFailed => AgentPhase::Error,
            Self::AlertAssessed
            | Self::BroadcastInitiated
            | Self::GeofenceCreated
            | Self::TipReceived
            | Self::AlertResolved
            | Self::AgentRecovered => AgentPhase::Success,
            Self::Connected
            | Self::SimulationReset
            | Self::AlertReported
            | Self::CameraScanning
            | Self::CameraScanComplete
            | Self::SuspectDetected
            | Self::TipProcessed => AgentPhase::Processing,
            Self::Other(name) => classify_by_name(name),
        }
    }
}

/// Substring classification of an arbitrary event type name.
///
/// `error`/`failed` → [`AgentPhase::Error`]; any of `success`, `completed`,
/// `initiated`, `created`, `assessed`, `received`, `resolved`, `recovered`
/// → [`AgentPhase::Success`]; anything else → [`AgentPhase::Processing`].
/// Error substrings win over success substrings.
pub fn classify_by_name(name: &str) -> AgentPhase {
    const ERROR_MARKERS: [&str; 2] = ["error", "failed"];
    const SUCCESS_MARKERS: [&str; 8] = [
        "success",
        "completed",
        "initiated",
        "created",
        "assessed",
        "received",
        "resolved",
        "recovered",
    ];

    if ERROR_MARKERS.iter().any(|m| name.contains(m)) {
        AgentPhase::Error
    } else if SUCCESS_MARKERS.iter().any(|m| name.contains(m)) {
        AgentPhase::Success
    } else {
        AgentPhase::Processing
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "connected" => Self::Connected,
            "simulation_reset" => Self::SimulationReset,
            "alert_reported" => Self::AlertReported,
            "alert_assessed" => Self::AlertAssessed,
            "broadcast_initiated" => Self::BroadcastInitiated,
            "geofence_created" => Self::GeofenceCreated,
            "camera_scanning" => Self::CameraScanning,
            "camera_scan_complete" => Self::CameraScanComplete,
            "suspect_detected" => Self::SuspectDetected,
            "tip_received" => Self::TipReceived,
            "tip_processed" => Self::TipProcessed,
            "alert_resolved" => Self::AlertResolved,
            "agent_failed" => Self::AgentFailed,
            "agent_recovered" => Self::AgentRecovered,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(other) => other,
            named => named.as_str().to_owned(),
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One event on the stream.
///
/// The JSON form carries exactly `id`, `timestamp`, `type`, `from`,
/// optional `to`, optional `alert_id`, optional `data`, and `color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Globally unique identifier, never reused.
    pub id: String,
    /// Milliseconds since the Unix epoch, assigned at creation.
    #[ts(type = "number")]
    pub timestamp: i64,
    /// Event type.
    #[serde(rename = "type")]
    #[ts(type = "string")]
    pub kind: EventKind,
    /// Originating agent, or `"System"`.
    pub from: String,
    /// Target agent for a point-to-point hand-off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub to: Option<String>,
    /// Correlation key of the incident this event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub alert_id: Option<String>,
    /// Kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub data: Option<serde_json::Value>,
    /// Presentation hint, carried end to end.
    #[serde(default)]
    pub color: String,
}

impl Event {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(kind: EventKind, from: impl Into<String>) -> Self {
        let id = new_event_id(kind.as_str());
        Self {
            id,
            timestamp: now_millis(),
            kind,
            from: from.into(),
            to: None,
            alert_id: None,
            data: None,
            color: String::new(),
        }
    }

    /// The greeting a new subscriber receives before anything else.
    pub fn connected() -> Self {
        let timestamp = now_millis();
        Self {
            id: format!("init-{timestamp}"),
            timestamp,
            kind: EventKind::Connected,
            from: SYSTEM.to_owned(),
            to: None,
            alert_id: None,
            data: None,
            color: String::from("#00aaff"),
        }
    }

    /// Set the hand-off target.
    #[must_use]
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Bind the event to an incident.
    #[must_use]
    pub fn with_alert_id(mut self, alert_id: impl Into<String>) -> Self {
        self.alert_id = Some(alert_id.into());
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the presentation color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// The incident this event is attributed to.
    ///
    /// The top-level `alert_id` wins; otherwise a string `data.alert_id` is
    /// used.
    pub fn correlation_id(&self) -> Option<&str> {
        self.alert_id.as_deref().or_else(|| {
            self.data
                .as_ref()
                .and_then(|d| d.get("alert_id"))
                .and_then(serde_json::Value::as_str)
        })
    }

    /// Whether `other` is the same stored event (same `id` and `timestamp`).
    pub fn same_entry(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.id == other.id
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_strings_round_trip() {
        for kind in KNOWN_KINDS {
            let wire = String::from(kind.clone());
            assert_eq!(EventKind::from(wire), kind);
        }
        let custom = EventKind::from("drone_launched");
        assert_eq!(custom, EventKind::Other(String::from("drone_launched")));
        assert_eq!(custom.as_str(), "drone_launched");
    }

    #[test]
    fn explicit_table_matches_substring_rules() {
        for kind in KNOWN_KINDS {
            assert_eq!(
                kind.origin_phase(),
                classify_by_name(kind.as_str()),
                "classification drift for {kind}"
            );
        }
    }

    #[test]
    fn substring_rules() {
        assert_eq!(classify_by_name("upload_failed"), AgentPhase::Error);
        assert_eq!(classify_by_name("parse_error_received"), AgentPhase::Error);
        assert_eq!(classify_by_name("scan_completed"), AgentPhase::Success);
        assert_eq!(classify_by_name("drone_launched"), AgentPhase::Processing);
        assert_eq!(
            EventKind::from("task_success").origin_phase(),
            AgentPhase::Success
        );
    }

    #[test]
    fn json_shape_uses_type_and_omits_absent_fields() {
        let event = Event::new(EventKind::AlertReported, "Alert Receiver")
            .with_alert_id("AMBER-1")
            .with_color("#ff4444");
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "alert_reported");
        assert_eq!(json["alert_id"], "AMBER-1");
        assert!(json.get("to").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn parses_minimal_external_event() {
        let raw = r#"{"id":"e1","timestamp":5,"type":"tip_processed","from":"Tip Processor"}"#;
        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind, EventKind::TipProcessed);
        assert_eq!(event.color, "");
        assert!(event.alert_id.is_none());
    }

    #[test]
    fn correlation_falls_back_to_data() {
        let event = Event::new(EventKind::TipReceived, "Tip Processor")
            .with_data(serde_json::json!({ "alert_id": "AMBER-7" }));
        assert_eq!(event.correlation_id(), Some("AMBER-7"));

        let top = event.clone().with_alert_id("AMBER-8");
        assert_eq!(top.correlation_id(), Some("AMBER-8"));

        let none = Event::new(EventKind::AgentFailed, "Camera Agent");
        assert_eq!(none.correlation_id(), None);
    }

    #[test]
    fn connected_event_comes_from_system() {
        let event = Event::connected();
        assert_eq!(event.kind, EventKind::Connected);
        assert_eq!(event.from, SYSTEM);
        assert!(event.id.starts_with("init-"));
    }
}
