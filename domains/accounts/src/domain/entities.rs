//! Account domain entities
//!
//! Users, customer addresses, and the admin-managed serviceable-area list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellfix_auth::UserRole;
use wellfix_common::{Error, Result};

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: Option<String>, role: UserRole) -> Result<Self> {
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation("Invalid email address".to_string()));
        }

        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4(),
            email,
            name,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Customer address entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Create a new address with validation
    pub fn new(
        user_id: Uuid,
        street_address: String,
        city: String,
        state: String,
        pincode: String,
        is_default: bool,
    ) -> Result<Self> {
        if street_address.trim().is_empty() || city.trim().is_empty() || state.trim().is_empty() {
            return Err(Error::Validation(
                "Street address, city and state are required".to_string(),
            ));
        }
        validate_pincode(&pincode)?;

        let now = Utc::now();
        Ok(Address {
            id: Uuid::new_v4(),
            user_id,
            street_address,
            city,
            state,
            pincode,
            is_default,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Serviceable area entity, keyed by pincode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceableArea {
    pub pincode: String,
    pub is_active: bool,
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ServiceableArea {
    pub fn new(pincode: String, added_by: Option<Uuid>) -> Result<Self> {
        validate_pincode(&pincode)?;
        Ok(ServiceableArea {
            pincode,
            is_active: true,
            added_by,
            created_at: Utc::now(),
        })
    }
}

/// Validate a 6-digit pincode
pub fn validate_pincode(pincode: &str) -> Result<()> {
    let regex = regex::Regex::new(r"^[1-9][0-9]{5}$").unwrap();
    if !regex.is_match(pincode) {
        return Err(Error::Validation(
            "Pincode must be a 6-digit code not starting with 0".to_string(),
        ));
    }
    Ok(())
}
