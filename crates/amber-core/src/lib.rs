//! Configuration, scenario templates, and the incident scheduler for Amber
//! Relay.
//!
//! This crate owns everything that decides *what* gets published and
//! *when*. It never talks to observers directly; it publishes through the
//! [`EventPublisher`] seam that the observer's hub implements.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `amber-config.yaml` into
//!   strongly-typed structs.
//! - [`templates`] -- Lenient loading of the alert, tip, and resolution
//!   fixtures.
//! - [`variation`] -- The rotation of narrative substitutions.
//! - [`confidence`] -- Tip confidence scoring.
//! - [`timeline`] -- Pure planning of one incident's stages.
//! - [`stages`] -- Cancellable delayed-stage tracker.
//! - [`publisher`] -- [`EventPublisher`] trait and [`RecordingPublisher`].
//! - [`scheduler`] -- [`Scheduler`]: trigger, simulated failure, reset.
//!
//! [`EventPublisher`]: publisher::EventPublisher
//! [`RecordingPublisher`]: publisher::RecordingPublisher
//! [`Scheduler`]: scheduler::Scheduler

pub mod confidence;
pub mod config;
pub mod publisher;
pub mod scheduler;
pub mod stages;
pub mod templates;
pub mod timeline;
pub mod variation;
