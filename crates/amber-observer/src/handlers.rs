//! REST endpoint handlers for the relay API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/events` | Publish one event to every subscriber |
//! | `POST` | `/api/events/broadcast` | Same as `POST /api/events` |
//! | `POST` | `/api/trigger-alert` | Start a new incident timeline |
//! | `POST` | `/api/simulate-failure` | Fail an agent, recover it later |
//! | `POST` | `/api/reset` | Announce a simulation reset |
//! | `GET` | `/api/health` | Probe the agent gateway |
//!
//! Bodies are taken as raw bytes and parsed here so a malformed body
//! produces the relay's own error shape rather than Axum's rejection.

use std::sync::Arc;

use amber_types::{Event, EventKind, new_event_id, now_millis};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// An event as posted by external tooling. `id` and `timestamp` are filled
/// in when absent.
#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    /// Event id.
    pub id: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: Option<i64>,
    /// Event type.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Originating agent.
    pub from: String,
    /// Hand-off target.
    #[serde(default)]
    pub to: Option<String>,
    /// Incident correlation key.
    #[serde(default)]
    pub alert_id: Option<String>,
    /// Payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Presentation hint.
    #[serde(default)]
    pub color: String,
}

impl From<InboundEvent> for Event {
    fn from(inbound: InboundEvent) -> Self {
        Self {
            id: inbound
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| new_event_id(inbound.kind.as_str())),
            timestamp: inbound.timestamp.unwrap_or_else(now_millis),
            kind: inbound.kind,
            from: inbound.from,
            to: inbound.to,
            alert_id: inbound.alert_id,
            data: inbound.data,
            color: inbound.color,
        }
    }
}

/// Body of `POST /api/simulate-failure`.
#[derive(Debug, Deserialize)]
pub struct FailureRequest {
    /// Agent to fail.
    pub agent: String,
}

// ---------------------------------------------------------------------------
// POST /api/events, /api/events/broadcast
// ---------------------------------------------------------------------------

/// Publish one event to every live subscriber.
///
/// # Errors
///
/// Returns [`ObserverError::Serialization`] (500) if the body is not a
/// valid event.
pub async fn publish_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ObserverError> {
    let inbound: InboundEvent = serde_json::from_slice(&body)?;
    let event = Event::from(inbound);
    let report = state.hub.broadcast(&event)?;
    info!(
        kind = %event.kind,
        alert_id = event.alert_id.as_deref().unwrap_or("-"),
        delivered = report.delivered,
        "external event published"
    );
    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// POST /api/trigger-alert
// ---------------------------------------------------------------------------

/// Start a new incident.
///
/// # Errors
///
/// 404 if a template file is missing, 500 for any other template problem.
pub async fn trigger_alert(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ObserverError> {
    let incident = state.scheduler.trigger().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Alert triggered",
        "alert_id": incident.alert_id,
        "duration_ms": incident.duration_ms,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/simulate-failure
// ---------------------------------------------------------------------------

/// Fail an agent now and recover it after the configured delay.
///
/// # Errors
///
/// 500 if the body is malformed or names no agent.
pub async fn simulate_failure(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ObserverError> {
    let request: FailureRequest = serde_json::from_slice(&body)?;
    state.scheduler.simulate_failure(&request.agent)?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Failure simulated for {}", request.agent),
    })))
}

// ---------------------------------------------------------------------------
// POST /api/reset
// ---------------------------------------------------------------------------

/// Announce a simulation reset.
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ObserverError> {
    state.scheduler.reset()?;
    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Report whether the agent gateway is reachable. 503 when it is not.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let report = state.health.check().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = serde_json::to_value(&report).unwrap_or_else(|_| json!({ "status": "unknown" }));
    (status, Json(body))
}
