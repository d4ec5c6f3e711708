//! Authorization context for authenticated actors

use uuid::Uuid;

use crate::types::{AuthIdentity, UserRole};

/// Represents an authenticated actor context
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthIdentity,
}

impl AuthContext {
    /// Create new auth context for an actor
    pub fn new(user: AuthIdentity) -> Self {
        Self { user }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role.is_admin()
    }

    pub fn is_engineer(&self) -> bool {
        self.user.role.is_engineer()
    }

    pub fn is_customer(&self) -> bool {
        self.user.role.is_customer()
    }
}
