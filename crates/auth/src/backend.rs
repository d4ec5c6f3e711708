//! Concrete identity backend
//!
//! Wraps `PgPool` and owns the identity lookup query. Uses runtime
//! `sqlx::query_as` (not macros) consistent with the repository style
//! used across the domain crates.

use sqlx::PgPool;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::types::AuthIdentity;

/// Concrete identity backend.
///
/// Wraps a database pool. Resolves gateway-authenticated user ids to an
/// identity + role read model.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthBackend {
    pool: PgPool,
}

impl AuthBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find actor identity by ID (lightweight subset of the accounts User)
    pub(crate) async fn find_user(&self, id: Uuid) -> Result<Option<AuthIdentity>, AuthError> {
        let user: Option<AuthIdentity> = sqlx::query_as(
            r#"
            SELECT id, email, name, role, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %id, "Failed to load user");
            AuthError::UserLoadError
        })?;

        Ok(user)
    }

    /// Resolve a gateway-authenticated user id to an auth context.
    ///
    /// Deactivated accounts authenticate but are rejected here, so their
    /// requests never reach the authorization guard.
    pub async fn resolve(&self, user_id: Uuid) -> Result<AuthContext, AuthError> {
        let user = self
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        Ok(AuthContext::new(user))
    }
}
