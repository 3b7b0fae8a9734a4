//! Scenario template files.
//!
//! Three JSON fixtures in the configured data directory feed every
//! incident: `amber_alert.json` (the base alert), `tips.json` (incoming
//! tips), and `resolutions.json` (how incidents end). Parsing is lenient:
//! missing fields take defaults and unknown fields are ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// Base alert template file name.
pub const ALERT_FILE: &str = "amber_alert.json";
/// Tip template file name.
pub const TIPS_FILE: &str = "tips.json";
/// Resolution template file name.
pub const RESOLUTIONS_FILE: &str = "resolutions.json";

/// Errors raised while loading templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The file does not exist.
    #[error("template file not found at: {}", path.display())]
    NotFound {
        /// Path that was tried.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid JSON for its template shape.
    #[error("failed to parse template {}: {source}", path.display())]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The file parsed but holds no usable entry.
    #[error("template {} has no {what}", path.display())]
    Empty {
        /// Path that was parsed.
        path: PathBuf,
        /// What was expected.
        what: &'static str,
    },
}

/// The base alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertTemplate {
    /// Identifier carried by the fixture. Replaced per incident.
    pub alert_id: String,
    /// The missing child.
    pub child: Child,
    /// The suspect vehicle.
    pub vehicle: Vehicle,
    /// Last known whereabouts.
    pub last_known: LastKnown,
    /// Incident metadata.
    pub incident_details: IncidentDetails,
}

/// Child description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Child {
    /// Full name.
    pub name: String,
    /// Age in years, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Vehicle description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    /// Paint color.
    pub color: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Licence plate, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
}

impl Vehicle {
    /// `"<color> <make> <model>"`.
    pub fn describe(&self) -> String {
        format!("{} {} {}", self.color, self.make, self.model)
    }

    /// `"<color> <make>"`.
    pub fn color_and_make(&self) -> String {
        format!("{} {}", self.color, self.make)
    }
}

/// Last known position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastKnown {
    /// Place name.
    pub location: String,
    /// Coordinates, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coords {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// Incident metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentDetails {
    /// Urgency label.
    pub urgency: String,
}

impl Default for IncidentDetails {
    fn default() -> Self {
        Self {
            urgency: String::from("CRITICAL"),
        }
    }
}

/// `tips.json` layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TipsFile {
    tips: Vec<Tip>,
}

/// One incoming tip.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tip {
    /// Tip identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// What the caller saw.
    pub sighting: Sighting,
    /// Who called.
    pub caller_details: CallerDetails,
    /// Whether a photo accompanied the tip.
    pub photo_submitted: bool,
    /// Distance from the last known location, in kilometres.
    pub distance_km: Option<f64>,
}

/// Sighting details of a tip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Sighting {
    /// The caller saw the child.
    pub child_seen: bool,
    /// Vehicle attributes the caller reported.
    pub vehicle: Option<VehicleReport>,
    /// Pre-computed match flag used by older fixtures.
    pub vehicle_match: Option<bool>,
    /// The caller's description matched the child's.
    pub description_match: Option<bool>,
}

/// Vehicle attributes as reported by a caller. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VehicleReport {
    /// Reported color.
    pub color: Option<String>,
    /// Reported manufacturer.
    pub make: Option<String>,
    /// Reported model.
    pub model: Option<String>,
}

/// Caller details of a tip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CallerDetails {
    /// Free-text reliability note.
    pub reliability: Option<String>,
}

/// `resolutions.json` layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ResolutionsFile {
    resolutions: Vec<Resolution>,
}

/// How an incident ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Resolution {
    /// Resolution category.
    pub resolution_type: String,
    /// Outcome details.
    pub resolution_details: ResolutionDetails,
}

/// Outcome details of a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolutionDetails {
    /// What happened to the child.
    pub child_status: String,
    /// What happened to the suspect.
    pub suspect_status: String,
}

/// Everything one trigger needs from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSet {
    /// The base alert.
    pub alert: AlertTemplate,
    /// Tips in file order.
    pub tips: Vec<Tip>,
    /// The resolution applied to every incident.
    pub resolution: Resolution,
}

impl TemplateSet {
    /// Read all three template files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] naming the first missing file,
    /// or a read/parse error for a file that exists but is unusable.
    pub async fn load(dir: &Path) -> Result<Self, TemplateError> {
        let alert: AlertTemplate = read_json(&dir.join(ALERT_FILE)).await?;
        let tips: TipsFile = read_json(&dir.join(TIPS_FILE)).await?;

        let resolutions_path = dir.join(RESOLUTIONS_FILE);
        let resolutions: ResolutionsFile = read_json(&resolutions_path).await?;
        let resolution = resolutions
            .resolutions
            .into_iter()
            .next()
            .ok_or(TemplateError::Empty {
                path: resolutions_path,
                what: "resolutions",
            })?;

        Ok(Self {
            alert,
            tips: tips.tips,
            resolution,
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, TemplateError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TemplateError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(TemplateError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&raw).map_err(|source| TemplateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Accept `"TIP-7"` or `7` for identifiers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const ALERT_JSON: &str = r#"{
        "alert_id": "AMBER-ON-0001",
        "child": { "name": "Placeholder", "age": 8, "description": "red jacket" },
        "vehicle": { "color": "Grey", "make": "Kia", "model": "Soul", "plate": "ABCD 123" },
        "last_known": { "location": "Kanata", "coords": { "lat": 45.3, "lon": -75.9 } },
        "incident_details": { "urgency": "CRITICAL", "reported_by": "parent" }
    }"#;

    pub(crate) const TIPS_JSON: &str = r#"{
        "tips": [
            { "id": "TIP-001", "sighting": { "child_seen": true, "vehicle": { "color": "Blue" } },
              "caller_details": { "reliability": "Verified caller" }, "distance_km": 2.0 },
            { "id": 2, "sighting": { "child_seen": false, "vehicle_match": true },
              "photo_submitted": true },
            { "id": "TIP-003", "sighting": { "child_seen": false } }
        ]
    }"#;

    pub(crate) const RESOLUTIONS_JSON: &str = r#"{
        "resolutions": [
            { "resolution_type": "safe_recovery",
              "resolution_details": { "child_status": "safe", "suspect_status": "in_custody" } }
        ]
    }"#;

    /// Fresh directory under the system temp dir.
    pub(crate) fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("amber-{label}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Scratch directory populated with all three fixtures.
    pub(crate) fn fixture_dir(label: &str) -> PathBuf {
        let dir = scratch_dir(label);
        std::fs::write(dir.join(ALERT_FILE), ALERT_JSON).unwrap();
        std::fs::write(dir.join(TIPS_FILE), TIPS_JSON).unwrap();
        std::fs::write(dir.join(RESOLUTIONS_FILE), RESOLUTIONS_JSON).unwrap();
        dir
    }

    #[tokio::test]
    async fn loads_all_three_files() {
        let dir = fixture_dir("load");
        let set = TemplateSet::load(&dir).await.unwrap();

        assert_eq!(set.alert.vehicle.describe(), "Grey Kia Soul");
        assert_eq!(set.alert.incident_details.urgency, "CRITICAL");
        assert_eq!(set.tips.len(), 3);
        assert_eq!(set.tips.get(1).map(|t| t.id.as_str()), Some("2"));
        assert_eq!(set.resolution.resolution_details.suspect_status, "in_custody");
    }

    #[tokio::test]
    async fn missing_alert_file_reports_path() {
        let dir = scratch_dir("missing");
        let err = TemplateSet::load(&dir).await.unwrap_err();
        match err {
            TemplateError::NotFound { path } => assert!(path.ends_with(ALERT_FILE)),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_tips_is_parse_error() {
        let dir = fixture_dir("parse");
        std::fs::write(dir.join(TIPS_FILE), "{ tips: nope").unwrap();
        let err = TemplateSet::load(&dir).await.unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[tokio::test]
    async fn empty_resolutions_is_rejected() {
        let dir = fixture_dir("empty");
        std::fs::write(dir.join(RESOLUTIONS_FILE), r#"{"resolutions": []}"#).unwrap();
        let err = TemplateSet::load(&dir).await.unwrap_err();
        assert!(matches!(err, TemplateError::Empty { what: "resolutions", .. }));
    }

    #[test]
    fn sparse_alert_takes_defaults() {
        let alert: AlertTemplate = serde_json::from_str("{}").unwrap();
        assert_eq!(alert.incident_details.urgency, "CRITICAL");
        assert!(alert.last_known.coords.is_none());
    }
}
