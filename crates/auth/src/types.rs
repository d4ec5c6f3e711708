//! Auth read-model types
//!
//! Lightweight views of the user rows owned by the accounts domain.
//! These types carry only the fields needed for authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an actor in the repair workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Engineer,
    Admin,
}

impl UserRole {
    /// Check if this role may manage jobs on behalf of others
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Check if this role performs repairs
    pub fn is_engineer(&self) -> bool {
        matches!(self, UserRole::Engineer)
    }

    /// Check if this role owns repair requests
    pub fn is_customer(&self) -> bool {
        matches!(self, UserRole::Customer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Customer => write!(f, "CUSTOMER"),
            UserRole::Engineer => write!(f, "ENGINEER"),
            UserRole::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Lightweight identity for authenticated actors.
///
/// Contains the fields needed by the authorization guard and most handlers.
/// Handlers needing full `User` data should load from the accounts domain.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
