//! Route definitions for the jobs domain API

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{jobs, ratings};
use super::middleware::JobsState;

/// Create all jobs domain API routes
pub fn routes() -> Router<JobsState> {
    Router::new()
        .route("/v1/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/v1/jobs/{id}", get(jobs::get_job))
        .route("/v1/jobs/{id}/status", patch(jobs::update_status))
        .route("/v1/jobs/{id}/notes", post(jobs::add_notes))
        .route("/v1/jobs/{id}/quote", patch(jobs::update_quote))
        .route("/v1/jobs/{id}/payment", patch(jobs::update_payment))
        .route("/v1/jobs/{id}/cancel", post(jobs::cancel_job))
        .route(
            "/v1/jobs/{id}/assign",
            patch(jobs::assign_engineer).delete(jobs::unassign_engineer),
        )
        .route("/v1/jobs/{id}/history", get(jobs::get_history))
        .route(
            "/v1/jobs/{id}/rating",
            get(ratings::get_rating).post(ratings::submit_rating),
        )
}
