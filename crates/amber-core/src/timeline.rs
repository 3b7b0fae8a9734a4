//! Incident timeline planning.
//!
//! [`plan_incident`] is the pure half of a trigger: it turns templates, the
//! trigger number, and a chosen duration into the full list of events with
//! their absolute offsets from the trigger instant. The scheduler then only
//! has to publish the first stage and arm timers for the rest.

use amber_types::{
    AI_ANALYZER, ALERT_RECEIVER, BROADCAST_AGENT, CAMERA_AGENT, Event, EventKind,
    GEO_INTELLIGENCE, SYSTEM, TIP_PROCESSOR,
};
use serde_json::json;

use crate::confidence::score_tip;
use crate::config::ScenarioConfig;
use crate::templates::{AlertTemplate, TemplateSet};
use crate::variation::Variation;

/// Presentation color of a freshly reported alert.
pub const COLOR_REPORTED: &str = "#ff4444";
/// Presentation color of in-progress work.
pub const COLOR_WORKING: &str = "#ffa500";
/// Presentation color of completed work.
pub const COLOR_DONE: &str = "#00ff00";
/// Presentation color of geographic work.
pub const COLOR_GEO: &str = "#00aaff";

/// Channels every broadcast goes out on.
pub const BROADCAST_CHANNELS: [&str; 5] = ["phones", "highway_signs", "radio", "tv", "social"];
/// Zones of every geofence.
pub const GEOFENCE_ZONES: [&str; 3] = ["north_corridor", "highway_5", "rest_stops"];
/// Cameras engaged by a scan.
pub const CAMERA_COUNT: u32 = 12;

/// One event and when it fires, relative to the trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStage {
    /// Milliseconds after the trigger.
    pub offset_ms: u64,
    /// The event to publish. Its timestamp is restamped when it fires.
    pub event: Event,
}

/// A fully planned incident.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentPlan {
    /// Globally unique incident id carried by every event.
    pub alert_id: String,
    /// Human-readable id, `<prefix>-NNN`.
    pub base_alert_id: String,
    /// 1-based trigger number within this process.
    pub trigger_number: u64,
    /// Chosen incident duration.
    pub duration_ms: u64,
    /// The alert after variation substitution.
    pub alert: AlertTemplate,
    /// Every stage in ascending offset order; the first fires immediately
    /// and the last is the resolution.
    pub stages: Vec<PlannedStage>,
}

impl IncidentPlan {
    /// Offset of the resolution stage.
    pub fn resolution_offset_ms(&self) -> u64 {
        self.stages.last().map_or(0, |s| s.offset_ms)
    }
}

/// Inputs to [`plan_incident`].
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// Timeline parameters.
    pub scenario: &'a ScenarioConfig,
    /// Loaded templates.
    pub templates: &'a TemplateSet,
    /// 1-based trigger number.
    pub trigger_number: u64,
    /// Chosen incident duration.
    pub duration_ms: u64,
    /// Trigger time in epoch milliseconds.
    pub trigger_ms: i64,
}

/// Human-readable incident id for a trigger number.
pub fn base_alert_id(prefix: &str, trigger_number: u64) -> String {
    format!("{prefix}-{trigger_number:03}")
}

/// Build the full stage list for one incident.
pub fn plan_incident(input: PlanInput<'_>) -> IncidentPlan {
    let scenario = input.scenario;
    let base_id = base_alert_id(&scenario.alert_prefix, input.trigger_number);
    let alert_id = format!("{base_id}-{}", input.trigger_ms);
    let alert = Variation::for_trigger(input.trigger_number).apply(&input.templates.alert);

    let child = alert.child.name.as_str();
    let location = alert.last_known.location.as_str();
    let vehicle = alert.vehicle.describe();

    let mut stages = vec![
        PlannedStage {
            offset_ms: 0,
            event: Event::new(EventKind::AlertReported, ALERT_RECEIVER)
                .with_data(json!({ "alert_id": alert_id, "original_alert_id": base_id }))
                .with_color(COLOR_REPORTED),
        },
        PlannedStage {
            offset_ms: scenario.assessed_ms,
            event: Event::new(EventKind::AlertAssessed, AI_ANALYZER)
                .with_to(BROADCAST_AGENT)
                .with_data(json!({
                    "priority": "HIGH",
                    "urgency": alert.incident_details.urgency,
                    "child_name": child,
                    "location": location,
                    "vehicle": vehicle,
                }))
                .with_color(COLOR_WORKING),
        },
        PlannedStage {
            offset_ms: scenario.broadcast_ms,
            event: Event::new(EventKind::BroadcastInitiated, BROADCAST_AGENT)
                .with_data(json!({
                    "channels": BROADCAST_CHANNELS,
                    "alert_id": base_id,
                    "child_name": child,
                }))
                .with_color(COLOR_DONE),
        },
        PlannedStage {
            offset_ms: scenario.geofence_ms,
            event: Event::new(EventKind::GeofenceCreated, GEO_INTELLIGENCE)
                .with_to(CAMERA_AGENT)
                .with_data(json!({
                    "zones": GEOFENCE_ZONES,
                    "center_location": location,
                    "coordinates": alert.last_known.coords,
                }))
                .with_color(COLOR_GEO),
        },
        PlannedStage {
            offset_ms: scenario.camera_ms,
            event: Event::new(EventKind::CameraScanning, CAMERA_AGENT)
                .with_data(json!({
                    "status": "scanning",
                    "cameras": CAMERA_COUNT,
                    "target_vehicle": vehicle,
                    "search_area": location,
                }))
                .with_color(COLOR_WORKING),
        },
    ];

    let tips = input.templates.tips.iter().zip(&scenario.tip_offsets_ms);
    for (index, (tip, offset)) in tips.enumerate() {
        let confidence = score_tip(tip, &alert.vehicle);
        let mut data = json!({
            "tip_id": tip.id,
            "confidence": confidence.level.as_str(),
            "confidence_score": confidence.percentage(),
            "child_name": child,
        });
        if let Some(fields) = data.as_object_mut() {
            if index % 2 == 0 {
                fields.insert("location".to_owned(), json!(location));
            } else {
                fields.insert("vehicle_match".to_owned(), json!(alert.vehicle.color_and_make()));
            }
        }
        stages.push(PlannedStage {
            offset_ms: *offset,
            event: Event::new(EventKind::TipReceived, TIP_PROCESSOR)
                .with_to(AI_ANALYZER)
                .with_data(data)
                .with_color(COLOR_DONE),
        });
    }

    stages.sort_by_key(|s| s.offset_ms);
    let last_offset = stages.last().map_or(0, |s| s.offset_ms);
    let resolution_offset = input.duration_ms.max(last_offset);

    let resolution = &input.templates.resolution;
    stages.push(PlannedStage {
        offset_ms: resolution_offset,
        event: Event::new(EventKind::AlertResolved, SYSTEM)
            .with_data(json!({
                "resolution_type": resolution.resolution_type,
                "child_status": resolution.resolution_details.child_status,
                "suspect_status": resolution.resolution_details.suspect_status,
                "total_duration": format_seconds(resolution_offset),
                "location": location,
                "child_name": child,
                "alert_id": base_id,
            }))
            .with_color(COLOR_DONE),
    });

    for stage in &mut stages {
        stage.event.alert_id = Some(alert_id.clone());
    }

    IncidentPlan {
        alert_id,
        base_alert_id: base_id,
        trigger_number: input.trigger_number,
        duration_ms: input.duration_ms,
        alert,
        stages,
    }
}

/// `"<n> seconds"`, rounded to the nearest second.
pub fn format_seconds(ms: u64) -> String {
    format!("{} seconds", ms.saturating_add(500) / 1000)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::templates::{Resolution, ResolutionDetails, Tip};

    fn templates() -> TemplateSet {
        TemplateSet {
            alert: AlertTemplate::default(),
            tips: vec![
                Tip {
                    id: "TIP-001".to_owned(),
                    ..Tip::default()
                },
                Tip {
                    id: "TIP-002".to_owned(),
                    photo_submitted: true,
                    ..Tip::default()
                },
                Tip {
                    id: "TIP-003".to_owned(),
                    ..Tip::default()
                },
            ],
            resolution: Resolution {
                resolution_type: "safe_recovery".to_owned(),
                resolution_details: ResolutionDetails {
                    child_status: "safe".to_owned(),
                    suspect_status: "in_custody".to_owned(),
                },
            },
        }
    }

    fn plan(trigger_number: u64, duration_ms: u64) -> IncidentPlan {
        let scenario = ScenarioConfig::default();
        let set = templates();
        plan_incident(PlanInput {
            scenario: &scenario,
            templates: &set,
            trigger_number,
            duration_ms,
            trigger_ms: 1_700_000_000_000,
        })
    }

    #[test]
    fn ids_follow_prefix_and_trigger_time() {
        let p = plan(3, 12_000);
        assert_eq!(p.base_alert_id, "AMBER-CA-2026-003");
        assert_eq!(p.alert_id, "AMBER-CA-2026-003-1700000000000");
        assert!(
            p.stages
                .iter()
                .all(|s| s.event.alert_id.as_deref() == Some(p.alert_id.as_str()))
        );
    }

    #[test]
    fn offsets_ascend_and_resolution_is_last() {
        let p = plan(1, 30_000);
        let offsets: Vec<u64> = p.stages.iter().map(|s| s.offset_ms).collect();
        assert_eq!(offsets, vec![0, 1000, 2000, 2500, 3000, 4000, 5000, 30_000]);

        let kinds: Vec<&str> = p.stages.iter().map(|s| s.event.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "alert_reported",
                "alert_assessed",
                "broadcast_initiated",
                "geofence_created",
                "camera_scanning",
                "tip_received",
                "tip_received",
                "alert_resolved",
            ]
        );
        assert_eq!(p.resolution_offset_ms(), 30_000);
    }

    #[test]
    fn only_configured_tips_are_scheduled() {
        let p = plan(1, 30_000);
        let tips = p
            .stages
            .iter()
            .filter(|s| s.event.kind == EventKind::TipReceived)
            .count();
        assert_eq!(tips, 2);
    }

    #[test]
    fn resolution_never_precedes_last_tip() {
        let p = plan(2, 4500);
        assert_eq!(p.resolution_offset_ms(), 5000);
    }

    #[test]
    fn handoff_targets_and_colors() {
        let p = plan(1, 30_000);
        let find = |kind: EventKind| {
            p.stages
                .iter()
                .find(|s| s.event.kind == kind)
                .map(|s| s.event.clone())
                .unwrap()
        };
        let assessed = find(EventKind::AlertAssessed);
        assert_eq!(assessed.to.as_deref(), Some("Broadcast Agent"));
        assert_eq!(assessed.color, "#ffa500");

        let geofence = find(EventKind::GeofenceCreated);
        assert_eq!(geofence.to.as_deref(), Some("Camera Agent"));

        let tip = find(EventKind::TipReceived);
        assert_eq!(tip.to.as_deref(), Some("AI Analyzer"));
        assert_eq!(tip.from, "Tip Processor");

        assert_eq!(find(EventKind::AlertResolved).from, "System");
        assert_eq!(find(EventKind::AlertReported).color, "#ff4444");
    }

    #[test]
    fn variation_flows_into_payloads() {
        let p = plan(1, 30_000);
        let assessed = p.stages.get(1).and_then(|s| s.event.data.clone()).unwrap();
        assert_eq!(assessed["child_name"], "Emma Rodriguez");
        assert_eq!(assessed["location"], "Gatineau Park");
        assert_eq!(assessed["vehicle"], "Blue Honda Civic");
    }

    #[test]
    fn tip_payloads_alternate_location_and_vehicle() {
        let p = plan(1, 30_000);
        let tips: Vec<serde_json::Value> = p
            .stages
            .iter()
            .filter(|s| s.event.kind == EventKind::TipReceived)
            .filter_map(|s| s.event.data.clone())
            .collect();

        assert_eq!(tips[0]["tip_id"], "TIP-001");
        assert_eq!(tips[0]["location"], "Gatineau Park");
        assert_eq!(tips[0]["confidence"], "medium");
        assert_eq!(tips[0]["confidence_score"], 50);

        assert_eq!(tips[1]["vehicle_match"], "Blue Honda");
        assert_eq!(tips[1]["confidence_score"], 60);
    }

    #[test]
    fn resolution_payload() {
        let p = plan(1, 12_400);
        let data = p.stages.last().and_then(|s| s.event.data.clone()).unwrap();
        assert_eq!(data["total_duration"], "12 seconds");
        assert_eq!(data["alert_id"], "AMBER-CA-2026-001");
        assert_eq!(data["suspect_status"], "in_custody");
    }

    #[test]
    fn rounding_of_seconds() {
        assert_eq!(format_seconds(30_000), "30 seconds");
        assert_eq!(format_seconds(10_499), "10 seconds");
        assert_eq!(format_seconds(10_500), "11 seconds");
    }
}
