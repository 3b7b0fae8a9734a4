//! Configuration loading and typed config structures for Amber Relay.
//!
//! The canonical configuration lives in `amber-config.yaml` at the project
//! root. Every section and field has a default, so an empty file (or no file
//! at all) yields a working configuration that reproduces the reference
//! scenario timings.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Env var overriding [`BackendConfig::gateway_url`].
pub const GATEWAY_URL_ENV: &str = "SAM_GATEWAY_URL";
/// Env var overriding [`TemplatesConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "AMBER_DATA_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is internally inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AmberConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// External backend probed by the health endpoint.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Where scenario template files live.
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Incident timeline parameters.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Broadcast hub parameters.
    #[serde(default)]
    pub hub: HubConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AmberConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SAM_GATEWAY_URL` overrides `backend.gateway_url`
    /// - `AMBER_DATA_DIR` overrides `templates.data_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply env overrides and
    /// validate.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// The returned flag is `true` when the file was read.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool), ConfigError> {
        if path.exists() {
            return Self::from_file(path).map(|c| (c, true));
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok((config, false))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(GATEWAY_URL_ENV).filter(|v| !v.is_empty()) {
            self.backend.gateway_url = url;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.templates.data_dir = PathBuf::from(dir);
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario.validate()?;
        if self.hub.sink_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub.sink_capacity must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// External backend whose reachability the health endpoint reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agent gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Per-request probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Template file location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding `amber_alert.json`, `tips.json`, and
    /// `resolutions.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Incident timeline parameters. All offsets are measured from the trigger
/// instant, not from the previous stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Prefix of the human-readable incident id (`<prefix>-001`).
    #[serde(default = "default_alert_prefix")]
    pub alert_prefix: String,

    /// Duration of the first incident of the process lifetime.
    #[serde(default = "default_first_duration_ms")]
    pub first_duration_ms: u64,

    /// Inclusive lower bound of later incident durations.
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    /// Exclusive upper bound of later incident durations.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Offset of the assessment stage.
    #[serde(default = "default_assessed_ms")]
    pub assessed_ms: u64,

    /// Offset of the broadcast stage.
    #[serde(default = "default_broadcast_ms")]
    pub broadcast_ms: u64,

    /// Offset of the geofence stage.
    #[serde(default = "default_geofence_ms")]
    pub geofence_ms: u64,

    /// Offset of the camera scan stage.
    #[serde(default = "default_camera_ms")]
    pub camera_ms: u64,

    /// Offsets of the tip stages, one per scheduled tip.
    #[serde(default = "default_tip_offsets_ms")]
    pub tip_offsets_ms: Vec<u64>,

    /// Delay between a simulated agent failure and its recovery.
    #[serde(default = "default_recovery_delay_ms")]
    pub recovery_delay_ms: u64,

    /// Whether a reset aborts stages that have not fired yet.
    #[serde(default)]
    pub cancel_on_reset: bool,
}

impl ScenarioConfig {
    /// The latest fixed stage offset (resolution excluded).
    pub fn last_stage_offset_ms(&self) -> u64 {
        [
            self.assessed_ms,
            self.broadcast_ms,
            self.geofence_ms,
            self.camera_ms,
        ]
        .into_iter()
        .chain(self.tip_offsets_ms.iter().copied())
        .max()
        .unwrap_or(0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_duration_ms >= self.max_duration_ms {
            return Err(ConfigError::Invalid(format!(
                "scenario.min_duration_ms ({}) must be below scenario.max_duration_ms ({})",
                self.min_duration_ms, self.max_duration_ms
            )));
        }
        let last = self.last_stage_offset_ms();
        if self.min_duration_ms < last || self.first_duration_ms < last {
            return Err(ConfigError::Invalid(format!(
                "incident durations must not be shorter than the last stage offset ({last}ms)"
            )));
        }
        Ok(())
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            alert_prefix: default_alert_prefix(),
            first_duration_ms: default_first_duration_ms(),
            min_duration_ms: default_min_duration_ms(),
            max_duration_ms: default_max_duration_ms(),
            assessed_ms: default_assessed_ms(),
            broadcast_ms: default_broadcast_ms(),
            geofence_ms: default_geofence_ms(),
            camera_ms: default_camera_ms(),
            tip_offsets_ms: default_tip_offsets_ms(),
            recovery_delay_ms: default_recovery_delay_ms(),
            cancel_on_reset: false,
        }
    }
}

/// Broadcast hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Frames a sink may hold undelivered before it counts as failed.
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            sink_capacity: default_sink_capacity(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3000
}

fn default_gateway_url() -> String {
    String::from("http://localhost:8000")
}

const fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_alert_prefix() -> String {
    String::from("AMBER-CA-2026")
}

const fn default_first_duration_ms() -> u64 {
    30_000
}

const fn default_min_duration_ms() -> u64 {
    10_000
}

const fn default_max_duration_ms() -> u64 {
    30_000
}

const fn default_assessed_ms() -> u64 {
    1000
}

const fn default_broadcast_ms() -> u64 {
    2000
}

const fn default_geofence_ms() -> u64 {
    2500
}

const fn default_camera_ms() -> u64 {
    3000
}

fn default_tip_offsets_ms() -> Vec<u64> {
    vec![4000, 5000]
}

const fn default_recovery_delay_ms() -> u64 {
    3000
}

const fn default_sink_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AmberConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.backend.gateway_url, "http://localhost:8000");
        assert_eq!(config.scenario.first_duration_ms, 30_000);
        assert_eq!(config.scenario.last_stage_offset_ms(), 5000);
        assert!(!config.scenario.cancel_on_reset);
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
server:
  port: 4100
scenario:
  cancel_on_reset: true
  tip_offsets_ms: [4000, 6000, 7000]
logging:
  format: json
";
        let mut config: AmberConfig = serde_yml::from_str(yaml).unwrap();
        config.apply_overrides_from(|_| None);
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.scenario.cancel_on_reset);
        assert_eq!(config.scenario.last_stage_offset_ms(), 7000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.hub.sink_capacity, 256);
    }

    #[test]
    fn env_lookup_overrides_backend_and_data_dir() {
        let mut config = AmberConfig::default();
        config.apply_overrides_from(|key| match key {
            GATEWAY_URL_ENV => Some("http://gateway:9000".to_owned()),
            DATA_DIR_ENV => Some("/srv/amber".to_owned()),
            _ => None,
        });
        assert_eq!(config.backend.gateway_url, "http://gateway:9000");
        assert_eq!(config.templates.data_dir, PathBuf::from("/srv/amber"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut config = AmberConfig::default();
        config.apply_overrides_from(|_| Some(String::new()));
        assert_eq!(config.backend.gateway_url, "http://localhost:8000");
    }

    #[test]
    fn inverted_duration_range_is_rejected() {
        let mut config = AmberConfig::default();
        config.scenario.min_duration_ms = 30_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duration_shorter_than_tips_is_rejected() {
        let mut config = AmberConfig::default();
        config.scenario.tip_offsets_ms = vec![4000, 12_000];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_sink_capacity_is_rejected() {
        let mut config = AmberConfig::default();
        config.hub.sink_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = AmberConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
