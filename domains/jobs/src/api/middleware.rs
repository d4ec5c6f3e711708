//! Jobs domain state and auth backend integration

use std::sync::Arc;

use axum::extract::FromRef;
use wellfix_auth::AuthBackend;

use crate::service::JobWorkflowService;

/// Application state for the jobs domain
#[derive(Clone)]
pub struct JobsState {
    pub service: Arc<JobWorkflowService>,
    pub auth: AuthBackend,
}

impl FromRef<JobsState> for AuthBackend {
    fn from_ref(state: &JobsState) -> Self {
        state.auth.clone()
    }
}
