//! Axum router construction for the relay API.
//!
//! Assembles all routes (REST + SSE) into a single [`Router`] with CORS
//! middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;
use crate::state::AppState;

/// Build the complete Axum router for the relay server.
///
/// The router includes:
/// - `GET /api/events` -- SSE event stream
/// - `POST /api/events` -- publish an event
/// - `POST /api/events/broadcast` -- publish an event (alias)
/// - `POST /api/trigger-alert` -- start an incident
/// - `POST /api/simulate-failure` -- fail and recover an agent
/// - `POST /api/reset` -- announce a reset
/// - `GET /api/health` -- gateway reachability
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/events",
            get(sse::subscribe_events).post(handlers::publish_event),
        )
        .route("/api/events/broadcast", post(handlers::publish_event))
        .route("/api/trigger-alert", post(handlers::trigger_alert))
        .route("/api/simulate-failure", post(handlers::simulate_failure))
        .route("/api/reset", post(handlers::reset))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
