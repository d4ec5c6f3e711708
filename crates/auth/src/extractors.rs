//! Axum extractors for actor identity
//!
//! Generic over any state `S` where `AuthBackend: FromRef<S>`.
//! This is axum's idiomatic nested-state pattern.
//!
//! The upstream gateway terminates authentication and injects the verified
//! caller id as the `x-wellfix-user-id` header; these extractors resolve it
//! to a role-carrying context.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::backend::AuthBackend;
use crate::context::AuthContext;
use crate::error::AuthError;

/// Header set by the authenticating gateway
pub const IDENTITY_HEADER: &str = "x-wellfix-user-id";

/// Authenticated actor extractor
#[derive(Debug)]
pub struct AuthUser(pub AuthContext);

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let backend = AuthBackend::from_ref(state);

        let header = parts
            .headers
            .get(IDENTITY_HEADER)
            .ok_or(AuthError::MissingIdentity)?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|v| v.parse::<Uuid>().ok())
            .ok_or(AuthError::InvalidIdentityFormat)?;

        let auth_context = backend.resolve(user_id).await?;

        Ok(AuthUser(auth_context))
    }
}

/// Admin-only actor extractor.
///
/// Like `AuthUser` but rejects non-admin actors with 403 FORBIDDEN.
/// Use this for admin surfaces (serviceable-area management, user listing).
#[derive(Debug)]
pub struct AdminUser(pub AuthContext);

impl<S> FromRequestParts<S> for AdminUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let AuthUser(auth_context) = AuthUser::from_request_parts(parts, state).await?;

        if !auth_context.is_admin() {
            return Err(AuthError::InsufficientRole);
        }

        Ok(AdminUser(auth_context))
    }
}
