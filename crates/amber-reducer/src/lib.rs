//! Client-side state reducer for the Amber Relay event stream.
//!
//! Observers never ask the relay what the current state is. They subscribe
//! to the event stream and rebuild it: one incident aggregate per
//! `alert_id`, each with the fixed agent roster and a bounded, newest-first
//! event log.
//!
//! # Modules
//!
//! - [`board`] -- [`IncidentBoard`], the pure fold from events to incidents
//! - [`client`] -- [`watch`], which feeds a board from a live stream
//!
//! [`IncidentBoard`]: board::IncidentBoard
//! [`watch`]: client::watch

pub mod board;
pub mod client;

pub use board::{
    DropReason, EVENT_LOG_CAP, Incident, IncidentBoard, IncidentStatus, RESOLVED_LABEL,
    ReduceOutcome,
};
pub use client::{ClientError, WatchEnd, watch};
