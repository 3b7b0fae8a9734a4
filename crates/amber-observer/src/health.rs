//! Reachability probe for the agent gateway.
//!
//! `GET /api/health` reports whether the external gateway answers. The
//! probe walks a short list of paths and accepts the first one that
//! responds with a status below 500. `/docs` is only accepted when its body
//! looks like a FastAPI/Swagger page, since other dev servers answer on the
//! same port.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Paths tried, in order.
pub const PROBE_PATHS: [&str; 4] = ["/docs", "/openapi.json", "/health", "/"];

/// Markers that identify a FastAPI docs page.
const DOCS_MARKERS: [&str; 3] = ["FastAPI", "Swagger", "openapi"];

const UNHEALTHY_ERROR: &str = "Agent gateway is not accessible. Please ensure the agent backend is running.";
const UNHEALTHY_HINT: &str = "Check that the gateway is configured and started, and that SAM_GATEWAY_URL points at it (the message broker port is not the gateway port).";

/// Probe result, serialized as the health response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HealthReport {
    /// The gateway answered.
    Healthy {
        /// Always `"healthy"`.
        status: &'static str,
        /// Always `true`.
        sam_running: bool,
        /// Gateway base URL.
        gateway_url: String,
        /// Path that answered.
        checked_endpoint: &'static str,
    },
    /// No path answered.
    Unhealthy {
        /// Always `"unhealthy"`.
        status: &'static str,
        /// Always `false`.
        sam_running: bool,
        /// What went wrong.
        error: &'static str,
        /// Gateway base URL.
        gateway_url: String,
        /// What to check.
        hint: &'static str,
    },
}

impl HealthReport {
    /// Whether the gateway answered.
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Probes one gateway.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    gateway_url: String,
    timeout: Duration,
}

impl HealthProbe {
    /// Create a probe for `gateway_url` with a per-request timeout.
    pub fn new(gateway_url: impl Into<String>, timeout: Duration) -> Self {
        let gateway_url = gateway_url.into().trim_end_matches('/').to_owned();
        Self {
            client: reqwest::Client::new(),
            gateway_url,
            timeout,
        }
    }

    /// The gateway base URL.
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    /// Walk [`PROBE_PATHS`] and report the first acceptable answer.
    pub async fn check(&self) -> HealthReport {
        for path in PROBE_PATHS {
            if self.accepts(path).await {
                return HealthReport::Healthy {
                    status: "healthy",
                    sam_running: true,
                    gateway_url: self.gateway_url.clone(),
                    checked_endpoint: path,
                };
            }
        }
        HealthReport::Unhealthy {
            status: "unhealthy",
            sam_running: false,
            error: UNHEALTHY_ERROR,
            gateway_url: self.gateway_url.clone(),
            hint: UNHEALTHY_HINT,
        }
    }

    async fn accepts(&self, path: &'static str) -> bool {
        let url = format!("{}{path}", self.gateway_url);
        let response = match self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json, text/html, */*")
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "health probe failed");
                return false;
            }
        };

        let status = response.status().as_u16();
        if !(200..500).contains(&status) {
            debug!(url, status, "health probe rejected status");
            return false;
        }
        if path != "/docs" {
            return true;
        }
        match response.text().await {
            Ok(body) => DOCS_MARKERS.iter().any(|m| body.contains(m)),
            Err(e) => {
                debug!(url, error = %e, "health probe could not read docs body");
                false
            }
        }
    }
}
