//! Common error types and handling for WellFix

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the WellFix application
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid for the job's current status. Carries the current
    /// status and, for transition attempts, the offending requested status so
    /// callers can self-correct.
    #[error("Invalid state: {}", format_invalid_state(.current, .requested))]
    InvalidState {
        current: String,
        requested: Option<String>,
    },

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Lost a concurrent-mutation race or a bounded persistence timeout.
    /// Safe to retry after re-reading.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external collaborator failed or timed out. Distinct from Validation:
    /// the input was plausibly valid.
    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_invalid_state(current: &str, requested: &Option<String>) -> String {
    match requested {
        Some(requested) => format!(
            "transition from '{}' to '{}' is not permitted",
            current, requested
        ),
        None => format!("operation not permitted in status '{}'", current),
    }
}

impl Error {
    /// Build an `InvalidState` error for a rejected operation (no requested status).
    pub fn invalid_state(current: impl std::fmt::Display) -> Self {
        Error::InvalidState {
            current: current.to_string(),
            requested: None,
        }
    }

    /// Build an `InvalidState` error for a rejected transition.
    pub fn invalid_transition(
        current: impl std::fmt::Display,
        requested: impl std::fmt::Display,
    ) -> Self {
        Error::InvalidState {
            current: current.to_string(),
            requested: Some(requested.to_string()),
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidState { .. } => StatusCode::CONFLICT,
            Error::Duplicate(_) => StatusCode::CONFLICT,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Dependency(_) => StatusCode::BAD_GATEWAY,
            Error::Unexpected(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Authentication(_) => "AUTHENTICATION_ERROR",
            Error::Authorization(_) => "AUTHORIZATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidState { .. } => "INVALID_STATE",
            Error::Duplicate(_) => "DUPLICATE",
            Error::Conflict(_) => "CONFLICT",
            Error::Dependency(_) => "DEPENDENCY_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the operation unchanged (after re-reading).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::Dependency(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log internal errors with full context
        if matches!(self.status_code(), StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "Internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
