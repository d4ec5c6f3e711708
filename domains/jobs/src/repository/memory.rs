//! In-memory job store
//!
//! Used by the test suite and the mock provider in local development.
//! Reproduces the Postgres store's conditional-write semantics exactly, so
//! service-level tests exercise the same race behavior the production store
//! exhibits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use wellfix_common::{Error, Result};

use super::{JobFilter, JobStore};
use crate::domain::entities::{Job, JobHistoryEntry, Rating};

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    history: HashMap<Uuid, Vec<JobHistoryEntry>>,
    ratings: HashMap<Uuid, Rating>,
}

/// In-memory implementation of [`JobStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(job: &Job, filter: &JobFilter) -> bool {
        if let Some(status) = filter.status {
            if job.status != status {
                return false;
            }
        }
        if let Some(pincode) = &filter.pincode {
            if &job.pincode != pincode {
                return false;
            }
        }
        if let Some(customer_id) = filter.customer_id {
            if job.customer_id != customer_id {
                return false;
            }
        }
        if let Some(engineer_id) = filter.engineer_id {
            if job.engineer_id != Some(engineer_id) {
                return false;
            }
        }
        true
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: &Job, history: &JobHistoryEntry) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        if inner.jobs.contains_key(&job.id) {
            return Err(Error::Duplicate("Job already exists".to_string()));
        }
        inner.jobs.insert(job.id, job.clone());
        inner.history.entry(job.id).or_default().push(history.clone());
        Ok(job.clone())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.inner.lock().unwrap().jobs.get(&id).cloned())
    }

    async fn list(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|job| Self::matches(job, filter))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn update(
        &self,
        job: &Job,
        expected_updated_at: DateTime<Utc>,
        history: Option<&JobHistoryEntry>,
    ) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .jobs
            .get(&job.id)
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        if stored.updated_at != expected_updated_at {
            return Err(Error::Conflict(
                "Job was modified concurrently; re-read and retry".to_string(),
            ));
        }
        inner.jobs.insert(job.id, job.clone());
        if let Some(entry) = history {
            inner.history.entry(job.id).or_default().push(entry.clone());
        }
        Ok(job.clone())
    }

    async fn list_history(&self, job_id: Uuid) -> Result<Vec<JobHistoryEntry>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .history
            .get(&job_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<Rating> {
        let mut inner = self.inner.lock().unwrap();
        if inner.ratings.contains_key(&rating.job_id) {
            return Err(Error::Duplicate("Job already has a rating".to_string()));
        }
        inner.ratings.insert(rating.job_id, rating.clone());
        Ok(rating.clone())
    }

    async fn find_rating(&self, job_id: Uuid) -> Result<Option<Rating>> {
        Ok(self.inner.lock().unwrap().ratings.get(&job_id).cloned())
    }
}
