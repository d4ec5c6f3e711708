//! Jobs domain: repair-job workflow engine, ratings, job history

pub mod api;
pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::authorization::{AuthorizationGuard, JobAction};
pub use domain::entities::*;
pub use domain::state::{JobStateMachine, JobStatus, StateError};
pub use repository::{JobFilter, JobStore};
pub use service::workflow::{JobWorkflowService, StatusUpdateFields};
