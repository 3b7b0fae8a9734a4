//! Agent roster and per-agent status.
//!
//! Every incident aggregate tracks the same fixed roster of six agents.
//! Agents never report their own state; observers infer it from the events
//! an agent originates or receives.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Receives the raw alert and opens the incident.
pub const ALERT_RECEIVER: &str = "Alert Receiver";
/// Assesses the alert and scores incoming tips.
pub const AI_ANALYZER: &str = "AI Analyzer";
/// Pushes the alert out to public channels.
pub const BROADCAST_AGENT: &str = "Broadcast Agent";
/// Scans traffic cameras inside the geofence.
pub const CAMERA_AGENT: &str = "Camera Agent";
/// Ingests third-party tips.
pub const TIP_PROCESSOR: &str = "Tip Processor";
/// Builds search geofences around the last known location.
pub const GEO_INTELLIGENCE: &str = "Geo Intelligence";

/// Originator name used for events that no agent owns.
pub const SYSTEM: &str = "System";

/// The fixed roster seeded into every incident aggregate, in display order.
pub const AGENT_ROSTER: [&str; 6] = [
    ALERT_RECEIVER,
    AI_ANALYZER,
    BROADCAST_AGENT,
    CAMERA_AGENT,
    TIP_PROCESSOR,
    GEO_INTELLIGENCE,
];

/// Whether `name` is a member of [`AGENT_ROSTER`].
pub fn is_roster_agent(name: &str) -> bool {
    AGENT_ROSTER.iter().any(|agent| *agent == name)
}

/// Coarse activity state of one agent within one incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AgentPhase {
    /// No event observed for this agent yet.
    Idle,
    /// The agent is working or has been handed work.
    Processing,
    /// The agent's last action completed.
    Success,
    /// The agent's last action errored or the agent failed.
    Error,
    /// Hard failure. Reserved for displays; the reducer reports failures as
    /// [`AgentPhase::Error`].
    Failed,
}

/// Inferred status of one agent within one incident aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AgentStatus {
    /// Roster name of the agent.
    pub name: String,
    /// Current inferred phase.
    pub status: AgentPhase,
    /// Last event type (or a synthetic label) observed for this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub last_event: Option<String>,
    /// Millisecond timestamp of that observation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "number | undefined")]
    pub last_update: Option<i64>,
}

impl AgentStatus {
    /// A freshly seeded agent: idle, nothing observed.
    pub fn idle(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: AgentPhase::Idle,
            last_event: None,
            last_update: None,
        }
    }

    /// Record a new observation for this agent.
    pub fn observe(&mut self, status: AgentPhase, label: impl Into<String>, at: i64) {
        self.status = status;
        self.last_event = Some(label.into());
        self.last_update = Some(at);
    }
}
