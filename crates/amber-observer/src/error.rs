//! Error types for the relay HTTP API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{ "success": false, "error", "status" }`.

use amber_core::scheduler::SchedulerError;
use amber_core::templates::TemplateError;
use amber_types::WireError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the relay API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// Required data was not found.
    #[error("{0}")]
    NotFound(String),

    /// A request body could not be parsed, or a response not produced.
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// An event could not be encoded for the stream.
    #[error("{0}")]
    Wire(#[from] WireError),

    /// The scheduler refused the request.
    #[error("{0}")]
    Scheduler(SchedulerError),
}

impl From<SchedulerError> for ObserverError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Template(missing @ TemplateError::NotFound { .. }) => {
                Self::NotFound(missing.to_string())
            }
            other => Self::Scheduler(other),
        }
    }
}

impl ObserverError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Serialization(_) | Self::Wire(_) | Self::Scheduler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), error = %self, "request failed");

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
