//! Shared application state for the relay API server.
//!
//! [`AppState`] owns the one [`Hub`] of the process and the [`Scheduler`]
//! that publishes into it. Handlers reach both through Axum's `State`
//! extractor; nothing is process-global.

use std::sync::Arc;
use std::time::Duration;

use amber_core::config::AmberConfig;
use amber_core::publisher::EventPublisher;
use amber_core::scheduler::Scheduler;

use crate::health::HealthProbe;
use crate::hub::Hub;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live observer registry.
    pub hub: Arc<Hub>,
    /// Incident timeline driver, publishing through `hub`.
    pub scheduler: Arc<Scheduler>,
    /// Gateway reachability probe.
    pub health: HealthProbe,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub const fn new(hub: Arc<Hub>, scheduler: Arc<Scheduler>, health: HealthProbe) -> Self {
        Self {
            hub,
            scheduler,
            health,
        }
    }

    /// Build the hub, scheduler, and probe described by `config`.
    pub fn from_config(config: &AmberConfig) -> Self {
        let hub = Arc::new(Hub::new(config.hub.sink_capacity));
        let publisher: Arc<dyn EventPublisher> = hub.clone();
        let scheduler = Arc::new(Scheduler::new(
            config.scenario.clone(),
            config.templates.data_dir.clone(),
            publisher,
        ));
        let health = HealthProbe::new(
            config.backend.gateway_url.clone(),
            Duration::from_millis(config.backend.probe_timeout_ms),
        );
        Self::new(hub, scheduler, health)
    }
}
