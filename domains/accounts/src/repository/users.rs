//! User repository

use crate::domain::entities::User;
use crate::ports::{DirectoryUser, UserDirectory};
use sqlx::PgPool;
use uuid::Uuid;
use wellfix_auth::UserRole;
use wellfix_common::Result;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, is_active, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create a new user
    pub async fn create(&self, user: &User) -> Result<User> {
        let row = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, name, role, is_active, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// List users, optionally restricted to a role
    pub async fn list(&self, role: Option<UserRole>, limit: i64, offset: i64) -> Result<Vec<User>> {
        let rows = if let Some(role) = role {
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, role, is_active, created_at, updated_at
                FROM users WHERE role = $1
                ORDER BY created_at DESC LIMIT $2 OFFSET $3
                "#,
            )
            .bind(role)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, email, name, role, is_active, created_at, updated_at
                FROM users
                ORDER BY created_at DESC LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows)
    }

    /// Activate or deactivate a user account
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, role, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait::async_trait]
impl UserDirectory for UserRepository {
    async fn find(&self, user_id: Uuid) -> Result<Option<DirectoryUser>> {
        let row = sqlx::query_as::<_, DirectoryUser>(
            "SELECT id, role, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
