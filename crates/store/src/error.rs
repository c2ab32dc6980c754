//! Service-level errors with Sentry integration.
//!
//! Services report exactly two failure kinds: a user-facing Not-Found with a
//! specific message, or a generic Internal error. The underlying
//! `RepositoryError` of an internal failure is logged when the error is
//! created and kept as its `source()`, but never rendered to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;

/// Error returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A record the operation depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other failure. The cause is available through `source()`.
    #[error("Internal error")]
    Internal(#[source] RepositoryError),
}

impl ServiceError {
    /// Create a Not-Found error with a message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Whether this is a Not-Found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is an Internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => Self::not_found("Document was not found"),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                Self::Internal(other)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::Internal(ref cause) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %cause,
                    sentry_event_id = %event_id,
                    "Request error"
                );
                // Don't expose internal error details to clients
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

/// Result type alias for `ServiceError`.
pub type Result<T> = std::result::Result<T, ServiceError>;
