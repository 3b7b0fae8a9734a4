//! Shared type definitions for the Amber Relay incident simulation.
//!
//! This crate is the single source of truth for what travels on the event
//! stream. The hub, the scenario scheduler, and every observer depend on it
//! and on nothing else of each other. Types exported here flow downstream
//! to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Sink handles and event id generation
//! - [`event`] -- The [`Event`] entity and [`EventKind`] classification
//! - [`agent`] -- Agent roster, [`AgentPhase`], and [`AgentStatus`]
//! - [`wire`] -- `data: <json>` framing and incremental decoding

pub mod agent;
pub mod event;
pub mod ids;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use agent::{
    AGENT_ROSTER, AI_ANALYZER, ALERT_RECEIVER, AgentPhase, AgentStatus, BROADCAST_AGENT,
    CAMERA_AGENT, GEO_INTELLIGENCE, SYSTEM, TIP_PROCESSOR, is_roster_agent,
};
pub use event::{Event, EventKind, KNOWN_KINDS, classify_by_name, now_millis};
pub use ids::{SinkId, new_event_id};
pub use wire::{
    DEFAULT_MAX_PENDING, FrameDecoder, WireError, encode_frame, encode_payload, frame,
};
