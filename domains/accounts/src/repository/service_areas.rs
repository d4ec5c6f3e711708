//! Serviceable-area repository

use crate::domain::entities::ServiceableArea;
use crate::ports::ServiceAreaDirectory;
use sqlx::PgPool;
use wellfix_common::Result;

#[derive(Clone)]
pub struct ServiceAreaRepository {
    pool: PgPool,
}

impl ServiceAreaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a serviceable area by pincode
    pub async fn find(&self, pincode: &str) -> Result<Option<ServiceableArea>> {
        let row = sqlx::query_as::<_, ServiceableArea>(
            "SELECT pincode, is_active, added_by, created_at FROM serviceable_areas WHERE pincode = $1",
        )
        .bind(pincode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// List all serviceable areas
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ServiceableArea>> {
        let rows = sqlx::query_as::<_, ServiceableArea>(
            r#"
            SELECT pincode, is_active, added_by, created_at
            FROM serviceable_areas
            ORDER BY pincode ASC LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a new area, or reactivate it if the pincode already exists
    pub async fn upsert(&self, area: &ServiceableArea) -> Result<ServiceableArea> {
        let row = sqlx::query_as::<_, ServiceableArea>(
            r#"
            INSERT INTO serviceable_areas (pincode, is_active, added_by, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (pincode) DO UPDATE SET is_active = EXCLUDED.is_active
            RETURNING pincode, is_active, added_by, created_at
            "#,
        )
        .bind(&area.pincode)
        .bind(area.is_active)
        .bind(area.added_by)
        .bind(area.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Activate or deactivate an existing area
    pub async fn set_active(&self, pincode: &str, is_active: bool) -> Result<Option<ServiceableArea>> {
        let row = sqlx::query_as::<_, ServiceableArea>(
            r#"
            UPDATE serviceable_areas SET is_active = $2
            WHERE pincode = $1
            RETURNING pincode, is_active, added_by, created_at
            "#,
        )
        .bind(pincode)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait::async_trait]
impl ServiceAreaDirectory for ServiceAreaRepository {
    async fn is_active(&self, pincode: &str) -> Result<bool> {
        let active: Option<bool> = sqlx::query_scalar(
            "SELECT is_active FROM serviceable_areas WHERE pincode = $1",
        )
        .bind(pincode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(active.unwrap_or(false))
    }
}
