//! HTTP relay for the Amber Relay incident simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **SSE endpoint** (`GET /api/events`) streaming every published event
//!   as a `data: <json>` frame
//! - **Publish endpoints** (`POST /api/events`, `POST /api/events/broadcast`)
//!   for external agent tooling
//! - **Scenario endpoints** for triggering incidents, simulating agent
//!   failures, and resetting
//! - **Health endpoint** probing the external agent gateway
//!
//! # Architecture
//!
//! One [`Hub`] per process holds the live sinks. The scheduler from
//! `amber-core` publishes into it through the `EventPublisher` trait, and
//! each SSE connection is one bounded channel sink. A sink that cannot keep
//! up or has disconnected is dropped on the next publish; nothing is ever
//! queued on behalf of an observer beyond its own channel.
//!
//! [`Hub`]: hub::Hub

pub mod error;
pub mod handlers;
pub mod health;
pub mod hub;
pub mod router;
pub mod server;
pub mod sse;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use hub::{ChannelSink, EventSink, Hub, SinkError, Subscription};
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
