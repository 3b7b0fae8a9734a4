//! Relay server startup helper.
//!
//! Provides [`spawn_relay`] which binds the listener eagerly and then runs
//! the HTTP + SSE server on a background Tokio task, so bind failures
//! surface to the caller instead of inside the task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use amber_core::config::AmberConfig;
//! use amber_observer::startup::spawn_relay;
//! use amber_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let config = AmberConfig::default();
//! let state = Arc::new(AppState::from_config(&config));
//! let (addr, handle) = spawn_relay(&config.server, state).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use amber_core::config::ServerConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::server::{ServerError, listen_addr, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the relay server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind `config`'s address and serve on a background task.
///
/// Returns the bound address (useful with port `0`) and the task handle.
/// The caller should hold the handle and await or abort it on shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is invalid or cannot
/// be bound.
pub async fn spawn_relay(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<(SocketAddr, JoinHandle<()>), StartupError> {
    let addr = listen_addr(config)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;
    let bound = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "Relay server exited with error");
        }
    });

    tracing::info!(%bound, "Relay server spawned on background task");

    Ok((bound, handle))
}
