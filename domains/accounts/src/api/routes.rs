//! Route definitions for the accounts domain API

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{addresses, service_areas, users};
use super::middleware::AccountsState;

/// Create all accounts domain API routes
pub fn routes() -> Router<AccountsState> {
    Router::new()
        .route(
            "/v1/addresses",
            get(addresses::list_addresses).post(addresses::create_address),
        )
        .route(
            "/v1/addresses/{id}",
            get(addresses::get_address).delete(addresses::delete_address),
        )
        .route(
            "/v1/admin/service-areas",
            get(service_areas::list_areas).post(service_areas::create_area),
        )
        .route(
            "/v1/admin/service-areas/{pincode}",
            patch(service_areas::set_area_active),
        )
        .route("/v1/admin/users", get(users::list_users))
        .route("/v1/admin/users/{id}/active", post(users::set_user_active))
}
