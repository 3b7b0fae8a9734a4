//! Tip confidence scoring.
//!
//! Scores are kept in integer points (hundredths) so the label thresholds
//! compare exactly. A score of 100 points is a confidence of 1.0.

use serde::Serialize;

use crate::templates::{Tip, Vehicle, VehicleReport};

/// Starting score of every tip.
pub const BASE_POINTS: i32 = 50;
/// Direct sighting of the child.
pub const SIGHTING_POINTS: i32 = 30;
/// Every reported vehicle attribute matched.
pub const FULL_VEHICLE_POINTS: i32 = 20;
/// Some reported vehicle attributes matched.
pub const PARTIAL_VEHICLE_POINTS: i32 = 10;
/// Description matched, only counted with a sighting.
pub const DESCRIPTION_POINTS: i32 = 10;
/// A photo was submitted.
pub const PHOTO_POINTS: i32 = 10;
/// Caller reliability mentions verification or history.
pub const RELIABILITY_POINTS: i32 = 20;
/// Adjustment for a tip close to the last known location.
pub const NEAR_POINTS: i32 = 10;
/// Adjustment for a tip far from the last known location.
pub const FAR_POINTS: i32 = -10;

/// Below this distance a tip counts as near.
pub const NEAR_KM: f64 = 5.0;
/// At or beyond this distance a tip counts as far.
pub const FAR_KM: f64 = 20.0;

/// Confidence label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// At least 70 points.
    High,
    /// At least 50 points.
    Medium,
    /// Below 50 points.
    Low,
}

impl ConfidenceLevel {
    /// Label for a clamped point score.
    pub const fn from_points(points: u8) -> Self {
        if points >= 70 {
            Self::High
        } else if points >= 50 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Wire label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// How well a tip's vehicle matches the incident vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleMatch {
    /// Nothing reported, or nothing matched.
    None,
    /// Some reported attributes matched.
    Partial,
    /// Every reported attribute matched.
    Full,
}

impl VehicleMatch {
    /// Compare a caller's report against the incident vehicle.
    ///
    /// Attributes are compared case-insensitively. An attribute the caller
    /// did not report is neither a match nor a miss.
    pub fn assess(report: &VehicleReport, vehicle: &Vehicle) -> Self {
        let pairs = [
            (report.color.as_deref(), vehicle.color.as_str()),
            (report.make.as_deref(), vehicle.make.as_str()),
            (report.model.as_deref(), vehicle.model.as_str()),
        ];
        let mut reported = 0_u8;
        let mut matched = 0_u8;
        for (said, actual) in pairs {
            let Some(said) = said.map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            reported = reported.saturating_add(1);
            if said.eq_ignore_ascii_case(actual.trim()) {
                matched = matched.saturating_add(1);
            }
        }

        if matched == 0 {
            Self::None
        } else if matched == reported {
            Self::Full
        } else {
            Self::Partial
        }
    }

    const fn points(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Partial => PARTIAL_VEHICLE_POINTS,
            Self::Full => FULL_VEHICLE_POINTS,
        }
    }
}

/// A scored tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confidence {
    /// Clamped score, 0..=100.
    pub points: u8,
    /// Label derived from `points`.
    pub level: ConfidenceLevel,
}

impl Confidence {
    /// Score as an integer percentage.
    pub const fn percentage(self) -> u8 {
        self.points
    }

    /// Score as a fraction in `0.0..=1.0`.
    pub fn score(self) -> f64 {
        f64::from(self.points) / 100.0
    }
}

/// Score a tip against the incident's vehicle.
pub fn score_tip(tip: &Tip, incident_vehicle: &Vehicle) -> Confidence {
    let sighting = &tip.sighting;
    let mut points = BASE_POINTS;

    if sighting.child_seen {
        points = points.saturating_add(SIGHTING_POINTS);
    }

    let mut vehicle = sighting
        .vehicle
        .as_ref()
        .map_or(VehicleMatch::None, |report| {
            VehicleMatch::assess(report, incident_vehicle)
        });
    if vehicle == VehicleMatch::None && sighting.vehicle_match == Some(true) {
        vehicle = VehicleMatch::Full;
    }
    points = points.saturating_add(vehicle.points());

    if sighting.child_seen && sighting.description_match == Some(true) {
        points = points.saturating_add(DESCRIPTION_POINTS);
    }

    if tip.photo_submitted {
        points = points.saturating_add(PHOTO_POINTS);
    }

    if tip
        .caller_details
        .reliability
        .as_deref()
        .is_some_and(vouched_for)
    {
        points = points.saturating_add(RELIABILITY_POINTS);
    }

    if let Some(km) = tip.distance_km {
        points = points.saturating_add(distance_points(km));
    }

    let clamped = u8::try_from(points.clamp(0, 100)).unwrap_or(0);
    Confidence {
        points: clamped,
        level: ConfidenceLevel::from_points(clamped),
    }
}

fn vouched_for(reliability: &str) -> bool {
    let lower = reliability.to_lowercase();
    lower.contains("verified") || lower.contains("previous")
}

fn distance_points(km: f64) -> i32 {
    if km < NEAR_KM {
        NEAR_POINTS
    } else if km < FAR_KM {
        0
    } else {
        FAR_POINTS
    }
}
