//! Rating API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellfix_auth::AuthUser;
use wellfix_common::Result;

use crate::api::middleware::JobsState;
use crate::domain::entities::Rating;

/// Rating response DTO
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub engineer_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id,
            job_id: r.job_id,
            customer_id: r.customer_id,
            engineer_id: r.engineer_id,
            score: r.score,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

/// Request for submitting a rating
#[derive(Debug, Deserialize)]
pub struct SubmitRatingRequest {
    pub score: i16,
    pub comment: Option<String>,
}

/// Submit the customer's rating for a completed job
pub async fn submit_rating(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>)> {
    let rating = state
        .service
        .submit_rating(&ctx, job_id, req.score, req.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(rating.into())))
}

/// Get the rating for a job
pub async fn get_rating(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<RatingResponse>> {
    let rating = state.service.get_rating(&ctx, job_id).await?;
    Ok(Json(rating.into()))
}
