//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Authentication error
#[derive(Debug)]
pub enum AuthError {
    MissingIdentity,
    InvalidIdentityFormat,
    UserNotFound,
    UserInactive,
    UserLoadError,
    /// Actor role insufficient for this route (admin-only surfaces)
    InsufficientRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                "MISSING_IDENTITY",
                "Identity header required",
            ),
            AuthError::InvalidIdentityFormat => (
                StatusCode::UNAUTHORIZED,
                "INVALID_IDENTITY",
                "Identity header is not a valid user id",
            ),
            AuthError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "USER_NOT_FOUND", "User not found")
            }
            AuthError::UserInactive => (
                StatusCode::UNAUTHORIZED,
                "USER_INACTIVE",
                "User account is deactivated",
            ),
            AuthError::UserLoadError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "USER_LOAD_ERROR",
                "Failed to load user",
            ),
            AuthError::InsufficientRole => (
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_ROLE",
                "Only admins can access this operation",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
