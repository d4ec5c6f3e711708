//! Job management API handlers
//!
//! Thin layer over `JobWorkflowService`: deserialize, delegate, shape the
//! response. All authorization and workflow validation lives in the service.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use wellfix_auth::AuthUser;
use wellfix_common::{Result, ValidatedJson};

use crate::api::middleware::JobsState;
use crate::domain::entities::{DeviceInfo, Job, JobHistoryEntry, PaymentStatus, RepairType};
use crate::domain::state::JobStatus;
use crate::repository::JobFilter;
use crate::service::StatusUpdateFields;

/// Job response DTO
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub engineer_id: Option<Uuid>,
    pub address_id: Uuid,
    pub pincode: String,
    pub device_manufacturer: String,
    pub device_model: String,
    pub device_serial_number: Option<String>,
    pub reported_symptoms: String,
    pub repair_type: RepairType,
    pub status: JobStatus,
    pub estimated_cost: Option<Decimal>,
    pub final_cost: Option<Decimal>,
    pub payment_status: PaymentStatus,
    pub customer_consent_for_lab: bool,
    pub engineer_notes: String,
    pub admin_notes: String,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            customer_id: j.customer_id,
            engineer_id: j.engineer_id,
            address_id: j.address_id,
            pincode: j.pincode,
            device_manufacturer: j.device_manufacturer,
            device_model: j.device_model,
            device_serial_number: j.device_serial_number,
            reported_symptoms: j.reported_symptoms,
            repair_type: j.repair_type,
            status: j.status,
            estimated_cost: j.estimated_cost,
            final_cost: j.final_cost,
            payment_status: j.payment_status,
            customer_consent_for_lab: j.customer_consent_for_lab,
            engineer_notes: j.engineer_notes,
            admin_notes: j.admin_notes,
            cancellation_reason: j.cancellation_reason,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

/// History entry response DTO
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub previous_status: Option<JobStatus>,
    pub new_status: JobStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<JobHistoryEntry> for HistoryEntryResponse {
    fn from(e: JobHistoryEntry) -> Self {
        Self {
            id: e.id,
            actor_id: e.actor_id,
            previous_status: e.previous_status,
            new_status: e.new_status,
            notes: e.notes,
            created_at: e.created_at,
        }
    }
}

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub status: Option<JobStatus>,
    pub pincode: Option<String>,
    pub customer_id: Option<Uuid>,
    pub engineer_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request for creating a job
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    pub address_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub device_manufacturer: String,
    #[validate(length(min = 1, max = 100))]
    pub device_model: String,
    #[validate(length(max = 100))]
    pub device_serial_number: Option<String>,
    #[validate(length(min = 1))]
    pub reported_symptoms: String,
    pub repair_type: RepairType,
}

/// Request for updating a job's status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: JobStatus,
    pub notes: Option<String>,
    pub customer_consent_for_lab: Option<bool>,
}

/// Request for appending notes
#[derive(Debug, Deserialize, Validate)]
pub struct AddNotesRequest {
    #[validate(length(min = 1))]
    pub notes: String,
}

/// Request for updating the quote
#[derive(Debug, Deserialize)]
pub struct UpdateQuoteRequest {
    pub estimated_cost: Option<Decimal>,
    pub final_cost: Option<Decimal>,
    pub notes: Option<String>,
}

/// Request for recording the payment outcome
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

/// Request for cancelling a job
#[derive(Debug, Deserialize, Validate)]
pub struct CancelJobRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Request for assigning an engineer
#[derive(Debug, Deserialize)]
pub struct AssignEngineerRequest {
    pub engineer_id: Uuid,
}

/// List jobs visible to the authenticated actor
pub async fn list_jobs(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<Vec<JobResponse>>> {
    let filter = JobFilter {
        status: params.status,
        pincode: params.pincode,
        customer_id: params.customer_id,
        engineer_id: params.engineer_id,
    };
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let jobs = state.service.list_jobs(&ctx, filter, limit, offset).await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

/// Get a single job by ID
pub async fn get_job(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let job = state.service.get_job(&ctx, id).await?;
    Ok(Json(job.into()))
}

/// Create a new repair job
pub async fn create_job(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>)> {
    let device = DeviceInfo {
        manufacturer: req.device_manufacturer,
        model: req.device_model,
        serial_number: req.device_serial_number,
        reported_symptoms: req.reported_symptoms,
    };
    let job = state
        .service
        .create_job(&ctx, req.address_id, device, req.repair_type)
        .await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

/// Update a job's workflow status
pub async fn update_status(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<JobResponse>> {
    let fields = StatusUpdateFields {
        customer_consent_for_lab: req.customer_consent_for_lab,
    };
    let job = state
        .service
        .update_status(&ctx, id, req.status, req.notes, fields)
        .await?;
    Ok(Json(job.into()))
}

/// Append notes to a job
pub async fn add_notes(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AddNotesRequest>,
) -> Result<Json<JobResponse>> {
    let job = state.service.add_notes(&ctx, id, &req.notes).await?;
    Ok(Json(job.into()))
}

/// Update a job's estimated/final cost
pub async fn update_quote(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuoteRequest>,
) -> Result<Json<JobResponse>> {
    let job = state
        .service
        .update_quote(&ctx, id, req.estimated_cost, req.final_cost, req.notes)
        .await?;
    Ok(Json(job.into()))
}

/// Record a job's payment outcome
pub async fn update_payment(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePaymentRequest>,
) -> Result<Json<JobResponse>> {
    let job = state
        .service
        .update_payment(&ctx, id, req.payment_status)
        .await?;
    Ok(Json(job.into()))
}

/// Cancel a job
pub async fn cancel_job(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CancelJobRequest>,
) -> Result<Json<JobResponse>> {
    let job = state.service.cancel_job(&ctx, id, &req.reason).await?;
    Ok(Json(job.into()))
}

/// Assign an engineer to a job (admin only)
pub async fn assign_engineer(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignEngineerRequest>,
) -> Result<Json<JobResponse>> {
    let job = state
        .service
        .assign_engineer(&ctx, id, req.engineer_id)
        .await?;
    Ok(Json(job.into()))
}

/// Remove the assigned engineer (admin only)
pub async fn unassign_engineer(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let job = state.service.unassign_engineer(&ctx, id).await?;
    Ok(Json(job.into()))
}

/// Get a job's status history
pub async fn get_history(
    AuthUser(ctx): AuthUser,
    State(state): State<JobsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>> {
    let history = state.service.get_history(&ctx, id).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}
