//! In-memory port implementations
//!
//! Backs the collaborator ports with plain maps for tests and local
//! development. Thread-safe via `Arc<Mutex<>>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use wellfix_auth::UserRole;
use wellfix_common::Result;

use super::{AddressBook, AddressRecord, DirectoryUser, ServiceAreaDirectory, UserDirectory};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, DirectoryUser>,
    addresses: HashMap<Uuid, AddressRecord>,
    areas: HashMap<String, bool>,
}

/// In-memory accounts directory implementing all three collaborator ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its id.
    pub fn add_user(&self, role: UserRole, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().users.insert(
            id,
            DirectoryUser {
                id,
                role,
                is_active,
            },
        );
        id
    }

    /// Register an address for a user and return its id.
    pub fn add_address(&self, user_id: Uuid, pincode: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().addresses.insert(
            id,
            AddressRecord {
                id,
                user_id,
                pincode: pincode.to_string(),
            },
        );
        id
    }

    /// Mark a pincode as serviceable (or not).
    pub fn set_area(&self, pincode: &str, is_active: bool) {
        self.inner
            .lock()
            .unwrap()
            .areas
            .insert(pincode.to_string(), is_active);
    }

    /// Deactivate a previously registered user.
    pub fn deactivate_user(&self, user_id: Uuid) {
        if let Some(user) = self.inner.lock().unwrap().users.get_mut(&user_id) {
            user.is_active = false;
        }
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryAccounts {
    async fn find(&self, user_id: Uuid) -> Result<Option<DirectoryUser>> {
        Ok(self.inner.lock().unwrap().users.get(&user_id).cloned())
    }
}

#[async_trait::async_trait]
impl AddressBook for InMemoryAccounts {
    async fn find(&self, address_id: Uuid) -> Result<Option<AddressRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .addresses
            .get(&address_id)
            .cloned())
    }
}

#[async_trait::async_trait]
impl ServiceAreaDirectory for InMemoryAccounts {
    async fn is_active(&self, pincode: &str) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .areas
            .get(pincode)
            .copied()
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookups() {
        let accounts = InMemoryAccounts::new();
        let customer = accounts.add_user(UserRole::Customer, true);
        let address = accounts.add_address(customer, "560001");
        accounts.set_area("560001", true);

        let user = UserDirectory::find(&accounts, customer).await.unwrap();
        assert_eq!(user.unwrap().role, UserRole::Customer);

        let record = AddressBook::find(&accounts, address).await.unwrap().unwrap();
        assert!(record.is_owned_by(customer));
        assert_eq!(record.pincode, "560001");

        assert!(accounts.is_active("560001").await.unwrap());
        assert!(!accounts.is_active("999999").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_lookups_return_none() {
        let accounts = InMemoryAccounts::new();
        assert!(UserDirectory::find(&accounts, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
        assert!(AddressBook::find(&accounts, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deactivate_user() {
        let accounts = InMemoryAccounts::new();
        let engineer = accounts.add_user(UserRole::Engineer, true);
        accounts.deactivate_user(engineer);
        let user = UserDirectory::find(&accounts, engineer).await.unwrap();
        assert!(!user.unwrap().is_active);
    }
}
