//! Postgres-backed job store

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use wellfix_common::{Error, Result};

use super::{JobFilter, JobStore};
use crate::domain::entities::{Job, JobHistoryEntry, Rating};

/// Column list shared by every job query
const JOB_COLUMNS: &str = "id, customer_id, engineer_id, address_id, pincode, \
    device_manufacturer, device_model, device_serial_number, reported_symptoms, \
    repair_type, status, estimated_cost, final_cost, payment_status, \
    customer_consent_for_lab, engineer_notes, admin_notes, cancellation_reason, \
    created_at, updated_at";

/// Bound on any single store operation. Exceeding it surfaces a retryable
/// error instead of hanging the request.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Postgres unique-violation SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(STORE_TIMEOUT, operation)
            .await
            .map_err(|_| Error::Conflict("Persistence operation timed out; retry".to_string()))?
    }
}

async fn insert_history_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &JobHistoryEntry,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO job_history (id, job_id, actor_id, previous_status, new_status, notes, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id)
    .bind(entry.job_id)
    .bind(entry.actor_id)
    .bind(entry.previous_status)
    .bind(entry.new_status)
    .bind(&entry.notes)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &Job, history: &JobHistoryEntry) -> Result<Job> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let query = format!(
                "INSERT INTO jobs ({JOB_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) \
                 RETURNING {JOB_COLUMNS}"
            );
            let row = sqlx::query_as::<_, Job>(&query)
                .bind(job.id)
                .bind(job.customer_id)
                .bind(job.engineer_id)
                .bind(job.address_id)
                .bind(&job.pincode)
                .bind(&job.device_manufacturer)
                .bind(&job.device_model)
                .bind(&job.device_serial_number)
                .bind(&job.reported_symptoms)
                .bind(job.repair_type)
                .bind(job.status)
                .bind(job.estimated_cost)
                .bind(job.final_cost)
                .bind(job.payment_status)
                .bind(job.customer_consent_for_lab)
                .bind(&job.engineer_notes)
                .bind(&job.admin_notes)
                .bind(&job.cancellation_reason)
                .bind(job.created_at)
                .bind(job.updated_at)
                .fetch_one(&mut *tx)
                .await?;
            insert_history_tx(&mut tx, history).await?;
            tx.commit().await?;
            Ok(row)
        })
        .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        self.bounded(async {
            let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
            let row = sqlx::query_as::<_, Job>(&query)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        })
        .await
    }

    async fn list(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<Job>> {
        self.bounded(async {
            // Build dynamic query; filters bind in the order they are appended
            let mut query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE 1=1");
            let mut arg = 2; // $1/$2 are limit/offset
            if filter.status.is_some() {
                arg += 1;
                query.push_str(&format!(" AND status = ${arg}"));
            }
            if filter.pincode.is_some() {
                arg += 1;
                query.push_str(&format!(" AND pincode = ${arg}"));
            }
            if filter.customer_id.is_some() {
                arg += 1;
                query.push_str(&format!(" AND customer_id = ${arg}"));
            }
            if filter.engineer_id.is_some() {
                arg += 1;
                query.push_str(&format!(" AND engineer_id = ${arg}"));
            }
            query.push_str(" ORDER BY created_at DESC LIMIT $1 OFFSET $2");

            let mut q = sqlx::query_as::<_, Job>(&query).bind(limit).bind(offset);
            if let Some(status) = filter.status {
                q = q.bind(status);
            }
            if let Some(pincode) = &filter.pincode {
                q = q.bind(pincode);
            }
            if let Some(customer_id) = filter.customer_id {
                q = q.bind(customer_id);
            }
            if let Some(engineer_id) = filter.engineer_id {
                q = q.bind(engineer_id);
            }
            let rows = q.fetch_all(&self.pool).await?;
            Ok(rows)
        })
        .await
    }

    async fn update(
        &self,
        job: &Job,
        expected_updated_at: DateTime<Utc>,
        history: Option<&JobHistoryEntry>,
    ) -> Result<Job> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let query = format!(
                "UPDATE jobs SET \
                    engineer_id = $2, status = $3, estimated_cost = $4, final_cost = $5, \
                    payment_status = $6, customer_consent_for_lab = $7, engineer_notes = $8, \
                    admin_notes = $9, cancellation_reason = $10, updated_at = $11 \
                 WHERE id = $1 AND updated_at = $12 \
                 RETURNING {JOB_COLUMNS}"
            );
            let row = sqlx::query_as::<_, Job>(&query)
                .bind(job.id)
                .bind(job.engineer_id)
                .bind(job.status)
                .bind(job.estimated_cost)
                .bind(job.final_cost)
                .bind(job.payment_status)
                .bind(job.customer_consent_for_lab)
                .bind(&job.engineer_notes)
                .bind(&job.admin_notes)
                .bind(&job.cancellation_reason)
                .bind(job.updated_at)
                .bind(expected_updated_at)
                .fetch_optional(&mut *tx)
                .await?;

            let row = match row {
                Some(row) => row,
                None => {
                    // Distinguish a lost race from a vanished job
                    let exists: Option<Uuid> =
                        sqlx::query_scalar("SELECT id FROM jobs WHERE id = $1")
                            .bind(job.id)
                            .fetch_optional(&mut *tx)
                            .await?;
                    return match exists {
                        Some(_) => Err(Error::Conflict(
                            "Job was modified concurrently; re-read and retry".to_string(),
                        )),
                        None => Err(Error::NotFound("Job not found".to_string())),
                    };
                }
            };

            if let Some(entry) = history {
                insert_history_tx(&mut tx, entry).await?;
            }
            tx.commit().await?;
            Ok(row)
        })
        .await
    }

    async fn list_history(&self, job_id: Uuid) -> Result<Vec<JobHistoryEntry>> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, JobHistoryEntry>(
                "SELECT id, job_id, actor_id, previous_status, new_status, notes, created_at \
                 FROM job_history WHERE job_id = $1 ORDER BY created_at ASC",
            )
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
        .await
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<Rating> {
        self.bounded(async {
            let row = sqlx::query_as::<_, Rating>(
                "INSERT INTO ratings (id, job_id, customer_id, engineer_id, score, comment, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING id, job_id, customer_id, engineer_id, score, comment, created_at",
            )
            .bind(rating.id)
            .bind(rating.job_id)
            .bind(rating.customer_id)
            .bind(rating.engineer_id)
            .bind(rating.score)
            .bind(&rating.comment)
            .bind(rating.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                // The unique index on job_id backstops racing submissions
                sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                    Error::Duplicate("Job already has a rating".to_string())
                }
                _ => Error::Database(e),
            })?;
            Ok(row)
        })
        .await
    }

    async fn find_rating(&self, job_id: Uuid) -> Result<Option<Rating>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, Rating>(
                "SELECT id, job_id, customer_id, engineer_id, score, comment, created_at \
                 FROM ratings WHERE job_id = $1",
            )
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        })
        .await
    }
}
