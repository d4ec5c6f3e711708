//! Address repository

use crate::domain::entities::Address;
use crate::ports::{AddressBook, AddressRecord};
use sqlx::PgPool;
use uuid::Uuid;
use wellfix_common::Result;

#[derive(Clone)]
pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find address by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Address>> {
        let row = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, street_address, city, state, pincode, is_default,
                   created_at, updated_at
            FROM addresses WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// List addresses belonging to a user
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let rows = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, street_address, city, state, pincode, is_default,
                   created_at, updated_at
            FROM addresses WHERE user_id = $1
            ORDER BY is_default DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a new address. Clearing the previous default rides in the same
    /// transaction so a user never ends up with two defaults.
    pub async fn create(&self, address: &Address) -> Result<Address> {
        let mut tx = self.pool.begin().await?;
        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(address.user_id)
                .execute(&mut *tx)
                .await?;
        }
        let row = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (id, user_id, street_address, city, state, pincode,
                                   is_default, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, street_address, city, state, pincode, is_default,
                      created_at, updated_at
            "#,
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.street_address)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(address.is_default)
        .bind(address.created_at)
        .bind(address.updated_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Delete an address by ID, scoped to its owner
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl AddressBook for AddressRepository {
    async fn find(&self, address_id: Uuid) -> Result<Option<AddressRecord>> {
        let row = sqlx::query_as::<_, AddressRecord>(
            "SELECT id, user_id, pincode FROM addresses WHERE id = $1",
        )
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
