//! User administration API handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellfix_auth::{AdminUser, UserRole};
use wellfix_common::{Error, Result};

use crate::api::middleware::AccountsState;
use crate::domain::entities::User;

/// User response DTO
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request for toggling a user account
#[derive(Debug, Deserialize)]
pub struct SetUserActiveRequest {
    pub is_active: bool,
}

/// List users, optionally filtered by role (admin only)
pub async fn list_users(
    AdminUser(_ctx): AdminUser,
    State(state): State<AccountsState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<Vec<UserResponse>>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);
    let users = state.repos.users.list(params.role, limit, offset).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Activate or deactivate a user account (admin only)
pub async fn set_user_active(
    AdminUser(_ctx): AdminUser,
    State(state): State<AccountsState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<UserResponse>> {
    let updated = state
        .repos
        .users
        .set_active(id, req.is_active)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
    Ok(Json(updated.into()))
}
