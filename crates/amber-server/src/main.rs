//! Amber Relay binary.
//!
//! Wires the event hub, the scenario scheduler, and the backend health
//! probe behind one HTTP listener, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `amber-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build shared state: hub, scheduler, health probe
//! 4. Serve the control API and event stream

mod error;

use std::path::Path;
use std::sync::Arc;

use amber_core::config::{AmberConfig, LogFormat, LoggingConfig};
use amber_observer::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::RelayError;

/// Config file looked up relative to the working directory.
const CONFIG_PATH: &str = "amber-config.yaml";

/// Application entry point for the relay.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails to
/// bind or serve.
#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // 1. Load configuration. Logging depends on it, so errors here go to
    //    stderr through the returned error.
    let (config, from_file) = AmberConfig::load_or_default(Path::new(CONFIG_PATH))?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    if from_file {
        info!(path = CONFIG_PATH, "Configuration loaded");
    } else {
        info!(path = CONFIG_PATH, "Config file not found, using defaults");
    }
    info!(
        gateway_url = %config.backend.gateway_url,
        data_dir = %config.templates.data_dir.display(),
        cancel_on_reset = config.scenario.cancel_on_reset,
        "Amber Relay starting"
    );

    // 3. Shared state.
    let state = Arc::new(AppState::from_config(&config));

    // 4. Serve until Ctrl-C.
    amber_observer::start_server(&config.server, state).await?;

    info!("Amber Relay shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) -> Result<(), RelayError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| RelayError::Logging {
        message: e.to_string(),
    })
}
