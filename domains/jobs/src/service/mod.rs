//! Workflow orchestration for the jobs domain

pub mod workflow;

pub use workflow::{JobWorkflowService, StatusUpdateFields};
