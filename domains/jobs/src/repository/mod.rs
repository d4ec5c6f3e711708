//! Repository contract for the jobs domain
//!
//! Every mutation is a conditional write keyed on the `updated_at` the
//! caller validated against, so read-validate-write is atomic per job id
//! even across stateless service instances. History rows ride in the same
//! atomic unit as the job write.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use wellfix_common::Result;

use crate::domain::entities::{Job, JobHistoryEntry, Rating};
use crate::domain::state::JobStatus;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

/// Filters for job listings
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub pincode: Option<String>,
    pub customer_id: Option<Uuid>,
    pub engineer_id: Option<Uuid>,
}

/// Persistence contract for jobs, ratings, and the status history log.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job together with its initial history entry.
    async fn insert(&self, job: &Job, history: &JobHistoryEntry) -> Result<Job>;

    /// Find a job by id.
    async fn find(&self, id: Uuid) -> Result<Option<Job>>;

    /// List jobs matching the filter, newest first.
    async fn list(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<Job>>;

    /// Conditionally persist a mutated job.
    ///
    /// The write only lands if the stored row still carries
    /// `expected_updated_at`; otherwise the mutation lost a race and the
    /// caller receives a retryable `Conflict`. An accompanying history entry,
    /// when given, is written atomically with the job.
    async fn update(
        &self,
        job: &Job,
        expected_updated_at: DateTime<Utc>,
        history: Option<&JobHistoryEntry>,
    ) -> Result<Job>;

    /// List a job's status history, oldest first.
    async fn list_history(&self, job_id: Uuid) -> Result<Vec<JobHistoryEntry>>;

    /// Persist a rating. Fails with `Duplicate` if the job already has one.
    async fn insert_rating(&self, rating: &Rating) -> Result<Rating>;

    /// Find the rating for a job, if any.
    async fn find_rating(&self, job_id: Uuid) -> Result<Option<Rating>>;
}
