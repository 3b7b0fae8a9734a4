//! The scenario scheduler.
//!
//! A trigger loads the templates, plans the incident, publishes the
//! reported stage immediately, and arms one independent timer per
//! remaining stage at its absolute offset from the trigger instant.
//! Failure simulation and reset publish through the same
//! [`EventPublisher`].

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use amber_types::{Event, EventKind, SYSTEM, WireError, now_millis};
use rand::Rng;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::publisher::{EventPublisher, PublishReport};
use crate::stages::StageTracker;
use crate::templates::{TemplateError, TemplateSet};
use crate::timeline::{COLOR_DONE, IncidentPlan, PlanInput, plan_incident};

/// Presentation color of a simulated failure.
pub const COLOR_FAILED: &str = "#cc0000";
/// Presentation color of a reset.
pub const COLOR_RESET: &str = "#888";

/// Errors surfaced to whoever asked for a trigger, failure, or reset.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Template data was missing or unusable.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// An event could not be serialized.
    #[error("failed to publish event: {0}")]
    Publish(#[from] WireError),

    /// The agent name was blank.
    #[error("agent name must not be empty")]
    EmptyAgent,
}

/// What a trigger scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredIncident {
    /// Unique incident id.
    pub alert_id: String,
    /// Human-readable id.
    pub base_alert_id: String,
    /// Chosen incident duration.
    pub duration_ms: u64,
    /// Offset at which the resolution fires.
    pub resolution_offset_ms: u64,
    /// 1-based trigger number.
    pub trigger_number: u64,
    /// Number of stages, the immediate one included.
    pub stages: usize,
}

/// Plays incident timelines through a publisher.
pub struct Scheduler {
    scenario: ScenarioConfig,
    data_dir: PathBuf,
    publisher: Arc<dyn EventPublisher>,
    tracker: Arc<StageTracker>,
    triggers: AtomicU64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("data_dir", &self.data_dir)
            .field("triggers", &self.triggers)
            .field("pending", &self.tracker.pending())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler reading templates from `data_dir`.
    pub fn new(
        scenario: ScenarioConfig,
        data_dir: impl Into<PathBuf>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            scenario,
            data_dir: data_dir.into(),
            publisher,
            tracker: Arc::new(StageTracker::new()),
            triggers: AtomicU64::new(0),
        }
    }

    /// Timeline parameters in use.
    pub const fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    /// Number of trigger invocations so far, failed ones included.
    pub fn trigger_count(&self) -> u64 {
        self.triggers.load(Ordering::SeqCst)
    }

    /// Stages armed but not yet fired.
    pub fn pending_stages(&self) -> usize {
        self.tracker.pending()
    }

    /// Start a new incident.
    ///
    /// Every invocation counts, failed ones included, so a failed first
    /// trigger still uses up the first variation and the fixed duration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Template`] if template data is missing or
    /// malformed; nothing is published or scheduled in that case.
    pub async fn trigger(&self) -> Result<TriggeredIncident, SchedulerError> {
        let trigger_number = self.triggers.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let templates = TemplateSet::load(&self.data_dir).await.inspect_err(|e| {
            warn!(trigger_number, error = %e, "trigger failed to load templates");
        })?;

        let duration_ms = self.pick_duration(trigger_number);
        let start = Instant::now();

        let plan = plan_incident(PlanInput {
            scenario: &self.scenario,
            templates: &templates,
            trigger_number,
            duration_ms,
            trigger_ms: now_millis(),
        });

        info!(
            alert_id = %plan.alert_id,
            trigger_number,
            duration_ms,
            stages = plan.stages.len(),
            "incident triggered"
        );

        let triggered = TriggeredIncident {
            alert_id: plan.alert_id.clone(),
            base_alert_id: plan.base_alert_id.clone(),
            duration_ms,
            resolution_offset_ms: plan.resolution_offset_ms(),
            trigger_number,
            stages: plan.stages.len(),
        };
        self.arm(plan, start)?;
        Ok(triggered)
    }

    /// Publish an `agent_failed` event now and an `agent_recovered` event
    /// after the configured recovery delay.
    pub fn simulate_failure(&self, agent: &str) -> Result<PublishReport, SchedulerError> {
        let agent = agent.trim();
        if agent.is_empty() {
            return Err(SchedulerError::EmptyAgent);
        }

        let failed = Event::new(EventKind::AgentFailed, agent)
            .with_data(json!({ "reason": "Simulated failure", "agent": agent }))
            .with_color(COLOR_FAILED);
        let report = self.publisher.publish(&failed)?;
        warn!(agent, "simulated agent failure");

        let delay = self.scenario.recovery_delay_ms;
        let recovered = Event::new(EventKind::AgentRecovered, agent)
            .with_data(json!({
                "agent": agent,
                "recovery_time": format!("{}s", delay / 1000),
            }))
            .with_color(COLOR_DONE);
        let deadline = deadline_after(Instant::now(), delay);
        let publisher = Arc::clone(&self.publisher);
        self.tracker
            .schedule(&format!("agent:{agent}"), deadline, move || {
                fire(publisher.as_ref(), recovered);
            });

        Ok(report)
    }

    /// Publish a `simulation_reset` event.
    ///
    /// Pending stages keep firing unless `cancel_on_reset` is set, in which
    /// case they are aborted first. Returns the number of aborted stages.
    pub fn reset(&self) -> Result<usize, SchedulerError> {
        let aborted = if self.scenario.cancel_on_reset {
            self.tracker.cancel_all()
        } else {
            0
        };

        let event = Event::new(EventKind::SimulationReset, SYSTEM).with_color(COLOR_RESET);
        self.publisher.publish(&event)?;
        info!(aborted, "simulation reset");
        Ok(aborted)
    }

    /// Abort the pending stages of one incident.
    pub fn cancel_incident(&self, alert_id: &str) -> usize {
        self.tracker.cancel(alert_id)
    }

    fn pick_duration(&self, trigger_number: u64) -> u64 {
        if trigger_number == 1 {
            return self.scenario.first_duration_ms;
        }
        let (min, max) = (self.scenario.min_duration_ms, self.scenario.max_duration_ms);
        if min >= max {
            return min;
        }
        rand::rng().random_range(min..max)
    }

    fn arm(&self, plan: IncidentPlan, start: Instant) -> Result<(), SchedulerError> {
        let alert_id = plan.alert_id;
        let mut stages = plan.stages.into_iter();

        if let Some(first) = stages.next() {
            let mut event = first.event;
            event.timestamp = now_millis();
            let report = self.publisher.publish(&event)?;
            debug!(
                alert_id = %alert_id,
                kind = %event.kind,
                delivered = report.delivered,
                "published first stage"
            );
        }

        for stage in stages {
            let publisher = Arc::clone(&self.publisher);
            let deadline = deadline_after(start, stage.offset_ms);
            self.tracker.schedule(&alert_id, deadline, move || {
                fire(publisher.as_ref(), stage.event);
            });
        }
        Ok(())
    }
}

/// Restamp and publish a delayed event.
fn fire(publisher: &dyn EventPublisher, mut event: Event) {
    event.timestamp = now_millis();
    match publisher.publish(&event) {
        Ok(report) => debug!(
            kind = %event.kind,
            alert_id = event.alert_id.as_deref().unwrap_or("-"),
            delivered = report.delivered,
            "stage fired"
        ),
        Err(e) => warn!(kind = %event.kind, error = %e, "stage failed to publish"),
    }
}

fn deadline_after(start: Instant, offset_ms: u64) -> Instant {
    start
        .checked_add(Duration::from_millis(offset_ms))
        .unwrap_or(start)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::publisher::RecordingPublisher;
    use crate::templates::tests::{
        ALERT_JSON, RESOLUTIONS_JSON, TIPS_JSON, fixture_dir, scratch_dir,
    };
    use crate::templates::{ALERT_FILE, RESOLUTIONS_FILE, TIPS_FILE};

    fn scheduler(dir: &Path, scenario: ScenarioConfig) -> (Scheduler, Arc<RecordingPublisher>) {
        let recorder = Arc::new(RecordingPublisher::new());
        let publisher: Arc<dyn EventPublisher> = recorder.clone();
        (Scheduler::new(scenario, dir, publisher), recorder)
    }

    fn offsets_ms(recorder: &RecordingPublisher, start: Instant) -> Vec<(String, u128)> {
        recorder
            .entries()
            .into_iter()
            .map(|(at, e)| (e.kind.to_string(), (at - start).as_millis()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn first_trigger_plays_full_timeline_at_absolute_offsets() {
        let dir = fixture_dir("timeline");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());
        let start = Instant::now();

        let incident = scheduler.trigger().await.unwrap();
        assert_eq!(incident.trigger_number, 1);
        assert_eq!(incident.duration_ms, 30_000);
        assert_eq!(incident.resolution_offset_ms, 30_000);
        assert_eq!(recorder.len(), 1);

        tokio::time::sleep(Duration::from_millis(31_000)).await;

        let got = offsets_ms(&recorder, start);
        let expected: Vec<(String, u128)> = [
            ("alert_reported", 0),
            ("alert_assessed", 1000),
            ("broadcast_initiated", 2000),
            ("geofence_created", 2500),
            ("camera_scanning", 3000),
            ("tip_received", 4000),
            ("tip_received", 5000),
            ("alert_resolved", 30_000),
        ]
        .into_iter()
        .map(|(k, ms)| (k.to_owned(), ms))
        .collect();
        assert_eq!(got, expected);

        let events = recorder.events();
        assert!(
            events
                .iter()
                .all(|e| e.alert_id.as_deref() == Some(incident.alert_id.as_str()))
        );
        let mut ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), events.len());
        assert_eq!(scheduler.pending_stages(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn later_triggers_draw_duration_in_range() {
        let dir = fixture_dir("durations");
        let (scheduler, _recorder) = scheduler(&dir, ScenarioConfig::default());

        let first = scheduler.trigger().await.unwrap();
        assert_eq!(first.duration_ms, 30_000);
        for n in 2..=20 {
            let incident = scheduler.trigger().await.unwrap();
            assert_eq!(incident.trigger_number, n);
            assert!((10_000..30_000).contains(&incident.duration_ms));
            assert_eq!(incident.resolution_offset_ms, incident.duration_ms);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ids_rotate_and_stay_unique() {
        let dir = fixture_dir("ids");
        let (scheduler, _recorder) = scheduler(&dir, ScenarioConfig::default());

        let a = scheduler.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = scheduler.trigger().await.unwrap();

        assert_eq!(a.base_alert_id, "AMBER-CA-2026-001");
        assert_eq!(b.base_alert_id, "AMBER-CA-2026-002");
        assert_ne!(a.alert_id, b.alert_id);
        assert!(a.alert_id.starts_with("AMBER-CA-2026-001-"));
    }

    #[tokio::test]
    async fn missing_templates_publish_nothing() {
        let dir = scratch_dir("no-templates");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());

        let err = scheduler.trigger().await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Template(TemplateError::NotFound { .. })
        ));
        assert!(recorder.is_empty());
        assert_eq!(scheduler.pending_stages(), 0);
        assert_eq!(scheduler.trigger_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trigger_uses_up_its_number() {
        let dir = scratch_dir("late-templates");
        let (scheduler, _recorder) = scheduler(&dir, ScenarioConfig::default());
        scheduler.trigger().await.unwrap_err();

        std::fs::write(dir.join(ALERT_FILE), ALERT_JSON).unwrap();
        std::fs::write(dir.join(TIPS_FILE), TIPS_JSON).unwrap();
        std::fs::write(dir.join(RESOLUTIONS_FILE), RESOLUTIONS_JSON).unwrap();

        let incident = scheduler.trigger().await.unwrap();
        assert_eq!(incident.trigger_number, 2);
        assert_eq!(incident.base_alert_id, "AMBER-CA-2026-002");
        assert!((10_000..30_000).contains(&incident.duration_ms));
        assert_eq!(scheduler.trigger_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_then_recovery_after_delay() {
        let dir = scratch_dir("failure");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());
        let start = Instant::now();

        scheduler.simulate_failure("Camera Agent").unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let got = offsets_ms(&recorder, start);
        assert_eq!(
            got,
            vec![
                ("agent_failed".to_owned(), 0),
                ("agent_recovered".to_owned(), 3000),
            ]
        );

        let events = recorder.events();
        let failed = events.first().unwrap();
        assert_eq!(failed.from, "Camera Agent");
        assert!(failed.alert_id.is_none());
        assert_eq!(failed.color, "#cc0000");
        assert_eq!(failed.data.as_ref().unwrap()["reason"], "Simulated failure");
        let recovered = events.get(1).unwrap();
        assert_eq!(recovered.data.as_ref().unwrap()["recovery_time"], "3s");
    }

    #[tokio::test]
    async fn blank_agent_is_rejected() {
        let dir = scratch_dir("blank");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());
        assert!(matches!(
            scheduler.simulate_failure("  "),
            Err(SchedulerError::EmptyAgent)
        ));
        assert!(recorder.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_keeps_pending_stages_by_default() {
        let dir = fixture_dir("reset-keep");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());

        scheduler.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(scheduler.reset().unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(30_000)).await;
        let kinds: Vec<String> = recorder.events().iter().map(|e| e.kind.to_string()).collect();
        assert_eq!(kinds.iter().filter(|k| *k == "simulation_reset").count(), 1);
        assert_eq!(kinds.last().map(String::as_str), Some("alert_resolved"));
        assert_eq!(recorder.len(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_when_configured() {
        let dir = fixture_dir("reset-cancel");
        let scenario = ScenarioConfig {
            cancel_on_reset: true,
            ..ScenarioConfig::default()
        };
        let (scheduler, recorder) = scheduler(&dir, scenario);

        scheduler.trigger().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(scheduler.reset().unwrap(), 6);

        tokio::time::sleep(Duration::from_millis(30_000)).await;
        let kinds: Vec<String> = recorder.events().iter().map(|e| e.kind.to_string()).collect();
        assert_eq!(
            kinds,
            vec!["alert_reported", "alert_assessed", "simulation_reset"]
        );
        assert_eq!(scheduler.pending_stages(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_event_comes_from_system() {
        let dir = scratch_dir("reset-shape");
        let (scheduler, recorder) = scheduler(&dir, ScenarioConfig::default());
        scheduler.reset().unwrap();

        let event = recorder.events().into_iter().next().unwrap();
        assert_eq!(event.kind, EventKind::SimulationReset);
        assert_eq!(event.from, "System");
        assert_eq!(event.color, "#888");
        assert!(event.alert_id.is_none());
    }
}
