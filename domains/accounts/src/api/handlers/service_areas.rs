//! Serviceable-area management API handlers (admin only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellfix_auth::AdminUser;
use wellfix_common::{Error, Pagination, Result};

use crate::api::middleware::AccountsState;
use crate::domain::entities::ServiceableArea;

/// Serviceable-area response DTO
#[derive(Debug, Serialize)]
pub struct ServiceAreaResponse {
    pub pincode: String,
    pub is_active: bool,
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<ServiceableArea> for ServiceAreaResponse {
    fn from(a: ServiceableArea) -> Self {
        Self {
            pincode: a.pincode,
            is_active: a.is_active,
            added_by: a.added_by,
            created_at: a.created_at,
        }
    }
}

/// Request for adding a serviceable area
#[derive(Debug, Deserialize)]
pub struct CreateAreaRequest {
    pub pincode: String,
}

/// Request for toggling a serviceable area
#[derive(Debug, Deserialize)]
pub struct SetAreaActiveRequest {
    pub is_active: bool,
}

/// List serviceable areas
pub async fn list_areas(
    AdminUser(_ctx): AdminUser,
    State(state): State<AccountsState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<ServiceAreaResponse>>> {
    let areas = state
        .repos
        .service_areas
        .list(pagination.limit(), pagination.offset())
        .await?;
    Ok(Json(areas.into_iter().map(Into::into).collect()))
}

/// Add a pincode to the serviceable list (reactivates if already present)
pub async fn create_area(
    AdminUser(ctx): AdminUser,
    State(state): State<AccountsState>,
    Json(req): Json<CreateAreaRequest>,
) -> Result<(StatusCode, Json<ServiceAreaResponse>)> {
    let area = ServiceableArea::new(req.pincode, Some(ctx.id()))?;
    let created = state.repos.service_areas.upsert(&area).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Toggle a pincode's serviceability
pub async fn set_area_active(
    AdminUser(_ctx): AdminUser,
    State(state): State<AccountsState>,
    Path(pincode): Path<String>,
    Json(req): Json<SetAreaActiveRequest>,
) -> Result<Json<ServiceAreaResponse>> {
    let updated = state
        .repos
        .service_areas
        .set_active(&pincode, req.is_active)
        .await?
        .ok_or_else(|| Error::NotFound("Serviceable area not found".to_string()))?;
    Ok(Json(updated.into()))
}
