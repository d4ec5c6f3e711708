//! Collaborator ports consumed by the jobs domain
//!
//! The workflow engine only needs narrow read models at its boundaries:
//! who a user is (role + active flag), who owns an address and where it is,
//! and whether a pincode is currently serviced. The Postgres repositories
//! implement these traits; `memory` provides in-memory implementations for
//! tests and local development.

pub mod memory;

use uuid::Uuid;

use wellfix_auth::UserRole;
use wellfix_common::Result;

/// Read model for user lookups at the assignment boundary
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub role: UserRole,
    pub is_active: bool,
}

/// Read model for address lookups at the job-creation boundary
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AddressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pincode: String,
}

impl AddressRecord {
    /// Check whether the address belongs to the given customer
    pub fn is_owned_by(&self, customer_id: Uuid) -> bool {
        self.user_id == customer_id
    }
}

/// Lookup of users by id
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<DirectoryUser>>;
}

/// Lookup of addresses by id
#[async_trait::async_trait]
pub trait AddressBook: Send + Sync {
    async fn find(&self, address_id: Uuid) -> Result<Option<AddressRecord>>;
}

/// Lookup of pincode serviceability
#[async_trait::async_trait]
pub trait ServiceAreaDirectory: Send + Sync {
    async fn is_active(&self, pincode: &str) -> Result<bool>;
}
