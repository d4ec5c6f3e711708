//! Address management API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use wellfix_auth::AuthUser;
use wellfix_common::{Error, Result, ValidatedJson};

use crate::api::middleware::AccountsState;
use crate::domain::entities::Address;

/// Address response DTO
#[derive(Debug, Serialize)]
pub struct AddressResponse {
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

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            street_address: a.street_address,
            city: a.city,
            state: a.state,
            pincode: a.pincode,
            is_default: a.is_default,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Request for creating an address
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 255))]
    pub street_address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
}

/// List the authenticated user's addresses
pub async fn list_addresses(
    AuthUser(ctx): AuthUser,
    State(state): State<AccountsState>,
) -> Result<Json<Vec<AddressResponse>>> {
    let addresses = state.repos.addresses.list_for_user(ctx.id()).await?;
    Ok(Json(addresses.into_iter().map(Into::into).collect()))
}

/// Get a single address by ID
pub async fn get_address(
    AuthUser(ctx): AuthUser,
    State(state): State<AccountsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AddressResponse>> {
    let address = state
        .repos
        .addresses
        .find(id)
        .await?
        .ok_or_else(|| Error::NotFound("Address not found".to_string()))?;

    // Existence never leaks across owners
    if address.user_id != ctx.id() && !ctx.is_admin() {
        return Err(Error::NotFound("Address not found".to_string()));
    }

    Ok(Json(address.into()))
}

/// Create a new address for the authenticated user
pub async fn create_address(
    AuthUser(ctx): AuthUser,
    State(state): State<AccountsState>,
    ValidatedJson(req): ValidatedJson<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>)> {
    let address = Address::new(
        ctx.id(),
        req.street_address,
        req.city,
        req.state,
        req.pincode,
        req.is_default,
    )?;
    let created = state.repos.addresses.create(&address).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Delete one of the authenticated user's addresses
pub async fn delete_address(
    AuthUser(ctx): AuthUser,
    State(state): State<AccountsState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let deleted = state.repos.addresses.delete(id, ctx.id()).await?;
    if !deleted {
        return Err(Error::NotFound("Address not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
