//! Incident aggregates rebuilt from the event stream.
//!
//! [`IncidentBoard`] folds events, one at a time and in arrival order, into
//! one [`Incident`] per `alert_id`. There is no server-side state to query;
//! the board is whatever the events say. Events that cannot be attributed,
//! repeat an already-stored entry, or arrive for a resolved incident are
//! dropped and reported through [`ReduceOutcome::Dropped`].

use std::collections::{BTreeMap, VecDeque};

use amber_types::{AGENT_ROSTER, AgentPhase, AgentStatus, Event, is_roster_agent};
use serde::Serialize;
use tracing::{debug, warn};

/// Maximum number of events kept per incident.
pub const EVENT_LOG_CAP: usize = 100;

/// Label applied to every agent when an incident resolves.
pub const RESOLVED_LABEL: &str = "Alert Resolved";

/// Lifecycle of an incident aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// Still accepting events.
    Active,
    /// Terminal. Only a repeated resolution or a global agent event is
    /// still accepted.
    Resolved,
}

/// One incident as reconstructed from its events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Correlation key.
    pub alert_id: String,
    /// Lifecycle state.
    pub status: IncidentStatus,
    /// Timestamp of the first event seen for this incident.
    pub created_at: i64,
    /// Timestamp of the resolving event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    /// Roster agents and their inferred status.
    pub agents: BTreeMap<String, AgentStatus>,
    /// Stored events, newest first, at most [`EVENT_LOG_CAP`].
    pub events: VecDeque<Event>,
}

impl Incident {
    /// A new active incident with the whole roster idle.
    pub fn new(alert_id: impl Into<String>, created_at: i64) -> Self {
        let agents = AGENT_ROSTER
            .iter()
            .map(|name| ((*name).to_owned(), AgentStatus::idle(name)))
            .collect();
        Self {
            alert_id: alert_id.into(),
            status: IncidentStatus::Active,
            created_at,
            resolved_at: None,
            agents,
            events: VecDeque::new(),
        }
    }

    /// Whether the incident has resolved.
    pub fn is_resolved(&self) -> bool {
        self.status == IncidentStatus::Resolved
    }

    /// Status of one roster agent.
    pub fn agent(&self, name: &str) -> Option<&AgentStatus> {
        self.agents.get(name)
    }

    /// Whether an event with the same `(id, timestamp)` is stored.
    pub fn contains(&self, event: &Event) -> bool {
        self.events.iter().any(|e| e.same_entry(event))
    }

    /// Store `event` at the front of the log unless it is a duplicate.
    /// Returns whether it was stored.
    fn record(&mut self, event: &Event) -> bool {
        if self.contains(event) {
            return false;
        }
        self.events.push_front(event.clone());
        self.events.truncate(EVENT_LOG_CAP);
        true
    }

    fn observe(&mut self, agent: &str, status: AgentPhase, label: String, at: i64) {
        if let Some(entry) = self.agents.get_mut(agent) {
            entry.observe(status, label, at);
        }
    }

    fn resolve(&mut self, at: i64) {
        self.status = IncidentStatus::Resolved;
        self.resolved_at = Some(at);
        for entry in self.agents.values_mut() {
            entry.observe(AgentPhase::Success, RESOLVED_LABEL, at);
        }
    }
}

/// Why an event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A connection or reset event, not tied to any incident.
    Control,
    /// No `alert_id` on the event or in its data.
    Unattributed,
    /// Already stored under the same `(id, timestamp)`.
    Duplicate,
    /// The incident has resolved.
    Resolved,
    /// A global agent event with no incident that tracks the agent.
    NoTarget,
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// The event was applied to one incident.
    Applied {
        /// Incident it was applied to.
        alert_id: String,
        /// Whether the incident was created by this event.
        created: bool,
    },
    /// A global agent event was applied to several incidents.
    FannedOut {
        /// Number of incidents it was applied to.
        incidents: usize,
    },
    /// The event was dropped.
    Dropped(DropReason),
}

/// All incidents seen on one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentBoard {
    incidents: BTreeMap<String, Incident>,
}

impl IncidentBoard {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the board.
    pub fn apply(&mut self, event: &Event) -> ReduceOutcome {
        if event.kind.is_control() {
            debug!(kind = %event.kind, "control event ignored");
            return ReduceOutcome::Dropped(DropReason::Control);
        }
        if event.kind.is_global_agent_event() {
            return self.apply_global(event);
        }

        let Some(alert_id) = event.correlation_id().map(str::to_owned) else {
            warn!(kind = %event.kind, id = %event.id, "event has no alert_id, dropping");
            return ReduceOutcome::Dropped(DropReason::Unattributed);
        };

        let created = !self.incidents.contains_key(&alert_id);
        let incident = self
            .incidents
            .entry(alert_id.clone())
            .or_insert_with(|| Incident::new(alert_id.clone(), event.timestamp));

        if incident.is_resolved() {
            if event.kind.is_resolution() && incident.record(event) {
                debug!(alert_id = %alert_id, "repeated resolution recorded");
                return ReduceOutcome::Applied { alert_id, created };
            }
            debug!(alert_id = %alert_id, kind = %event.kind, "incident resolved, dropping");
            return ReduceOutcome::Dropped(DropReason::Resolved);
        }

        if !incident.record(event) {
            debug!(alert_id = %alert_id, id = %event.id, "duplicate event dropped");
            return ReduceOutcome::Dropped(DropReason::Duplicate);
        }

        let at = event.timestamp;
        let kind = event.kind.as_str();
        incident.observe(&event.from, event.kind.origin_phase(), kind.to_owned(), at);
        if let Some(target) = event.to.as_deref().filter(|t| is_roster_agent(t)) {
            incident.observe(target, AgentPhase::Processing, format!("Received: {kind}"), at);
        }
        if event.kind.is_resolution() {
            incident.resolve(at);
            debug!(alert_id = %alert_id, "incident resolved");
        }

        ReduceOutcome::Applied { alert_id, created }
    }

    /// `agent_failed` / `agent_recovered`: apply to every tracked incident,
    /// resolved ones included.
    fn apply_global(&mut self, event: &Event) -> ReduceOutcome {
        let agent = event.from.as_str();
        let status = event.kind.origin_phase();

        let mut tracking = 0_usize;
        let mut touched = 0_usize;
        for incident in self.incidents.values_mut() {
            if !incident.agents.contains_key(agent) {
                continue;
            }
            tracking = tracking.saturating_add(1);
            if !incident.record(event) {
                continue;
            }
            incident.observe(agent, status, event.kind.as_str().to_owned(), event.timestamp);
            touched = touched.saturating_add(1);
        }

        if tracking == 0 {
            debug!(kind = %event.kind, agent, "no incident tracks agent");
            return ReduceOutcome::Dropped(DropReason::NoTarget);
        }
        if touched == 0 {
            debug!(kind = %event.kind, id = %event.id, agent, "duplicate global event dropped");
            return ReduceOutcome::Dropped(DropReason::Duplicate);
        }
        debug!(kind = %event.kind, agent, incidents = touched, "global agent event applied");
        ReduceOutcome::FannedOut { incidents: touched }
    }

    /// Look up one incident.
    pub fn get(&self, alert_id: &str) -> Option<&Incident> {
        self.incidents.get(alert_id)
    }

    /// All incidents, ordered by `alert_id`.
    pub fn incidents(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.values()
    }

    /// Incidents ordered by creation time, oldest first.
    pub fn by_creation(&self) -> Vec<&Incident> {
        let mut all: Vec<&Incident> = self.incidents.values().collect();
        all.sort_by_key(|i| i.created_at);
        all
    }

    /// Number of incidents.
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether no incident has been seen.
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Number of incidents that have not resolved.
    pub fn active_count(&self) -> usize {
        self.incidents.values().filter(|i| !i.is_resolved()).count()
    }

    /// Forget every incident.
    pub fn clear(&mut self) {
        self.incidents.clear();
    }
}
