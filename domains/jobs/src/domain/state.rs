//! Status state machine for repair jobs
//!
//! The transition table is a pure, exhaustively enumerable mapping of
//! (current status, requested status, actor role) to a verdict, plus the
//! per-transition consent requirement for the lab hand-off. Only direct
//! successors are ever allowed; there is no "closest match".

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wellfix_auth::UserRole;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Guard condition failed: {0}")]
    GuardFailed(String),

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

/// Repair job status.
///
/// The on-site and lab paths diverge at ON_SITE_DIAGNOSIS and rejoin at
/// PENDING_PAYMENT. CANCELLED is reachable only through the cancel
/// operation, never through a status update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    PendingAssignment,
    AssignedToEngineer,
    EnRoute,
    OnSiteDiagnosis,
    RepairInProgressOnSite,
    EscalatedToLab,
    PendingPickupForLab,
    InTransitToLab,
    LabDiagnosis,
    PendingQuoteApproval,
    RepairInProgressLab,
    PendingReturnDelivery,
    InTransitFromLab,
    PendingPayment,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// All states, for exhaustive table sweeps
    pub const ALL: [JobStatus; 16] = [
        JobStatus::PendingAssignment,
        JobStatus::AssignedToEngineer,
        JobStatus::EnRoute,
        JobStatus::OnSiteDiagnosis,
        JobStatus::RepairInProgressOnSite,
        JobStatus::EscalatedToLab,
        JobStatus::PendingPickupForLab,
        JobStatus::InTransitToLab,
        JobStatus::LabDiagnosis,
        JobStatus::PendingQuoteApproval,
        JobStatus::RepairInProgressLab,
        JobStatus::PendingReturnDelivery,
        JobStatus::InTransitFromLab,
        JobStatus::PendingPayment,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Get all valid direct successors of the current state.
    ///
    /// CANCELLED and the assignment statuses never appear here through the
    /// status-update operation path; see `JobStateMachine::transition`.
    pub fn successors(&self) -> &'static [JobStatus] {
        match self {
            Self::PendingAssignment => &[Self::AssignedToEngineer],
            Self::AssignedToEngineer => &[Self::EnRoute],
            Self::EnRoute => &[Self::OnSiteDiagnosis],
            Self::OnSiteDiagnosis => &[Self::RepairInProgressOnSite, Self::EscalatedToLab],
            Self::RepairInProgressOnSite => &[Self::PendingPayment],
            Self::EscalatedToLab => &[Self::PendingPickupForLab],
            Self::PendingPickupForLab => &[Self::InTransitToLab],
            Self::InTransitToLab => &[Self::LabDiagnosis],
            Self::LabDiagnosis => &[Self::PendingQuoteApproval],
            Self::PendingQuoteApproval => &[Self::RepairInProgressLab],
            Self::RepairInProgressLab => &[Self::PendingReturnDelivery],
            Self::PendingReturnDelivery => &[Self::InTransitFromLab],
            Self::InTransitFromLab => &[Self::PendingPayment],
            Self::PendingPayment => &[Self::Completed],
            Self::Completed => &[],
            Self::Cancelled => &[],
        }
    }

    /// Transitions into these states carry the customer's lab consent in the
    /// same call; the consent flag flips true as a side effect.
    pub fn requires_lab_consent(&self) -> bool {
        matches!(self, Self::EscalatedToLab | Self::PendingPickupForLab)
    }

    /// Whether the cancel operation is still available (repair not yet
    /// physically started).
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::PendingAssignment | Self::AssignedToEngineer)
    }

    /// Whether the lab quote stage has been reached (`estimated_cost` may be
    /// set). On-site jobs never pass through a quote stage.
    pub fn quote_stage_reached(&self) -> bool {
        matches!(
            self,
            Self::LabDiagnosis
                | Self::PendingQuoteApproval
                | Self::RepairInProgressLab
                | Self::PendingReturnDelivery
                | Self::InTransitFromLab
                | Self::PendingPayment
                | Self::Completed
        )
    }

    /// Whether the settlement stage has been reached (`final_cost` and
    /// payment status may be set).
    pub fn settlement_stage_reached(&self) -> bool {
        matches!(self, Self::PendingPayment | Self::Completed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PendingAssignment => "PENDING_ASSIGNMENT",
            Self::AssignedToEngineer => "ASSIGNED_TO_ENGINEER",
            Self::EnRoute => "EN_ROUTE",
            Self::OnSiteDiagnosis => "ON_SITE_DIAGNOSIS",
            Self::RepairInProgressOnSite => "REPAIR_IN_PROGRESS_ON_SITE",
            Self::EscalatedToLab => "ESCALATED_TO_LAB",
            Self::PendingPickupForLab => "PENDING_PICKUP_FOR_LAB",
            Self::InTransitToLab => "IN_TRANSIT_TO_LAB",
            Self::LabDiagnosis => "LAB_DIAGNOSIS",
            Self::PendingQuoteApproval => "PENDING_QUOTE_APPROVAL",
            Self::RepairInProgressLab => "REPAIR_IN_PROGRESS_LAB",
            Self::PendingReturnDelivery => "PENDING_RETURN_DELIVERY",
            Self::InTransitFromLab => "IN_TRANSIT_FROM_LAB",
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{}", name)
    }
}

/// Job status state machine
pub struct JobStateMachine;

impl JobStateMachine {
    /// Attempt a status transition.
    ///
    /// Returns the new status if the transition is valid for the actor's
    /// role, or an error otherwise. `lab_consent` is the consent flag
    /// supplied in the same call; transitions into the lab hand-off states
    /// are rejected without it.
    pub fn transition(
        current: JobStatus,
        requested: JobStatus,
        role: UserRole,
        lab_consent: Option<bool>,
    ) -> Result<JobStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        // Customers never drive the status-update path; their mutations are
        // create and cancel.
        if role == UserRole::Customer {
            return Err(StateError::InvalidTransition {
                from: current.to_string(),
                to: requested.to_string(),
            });
        }

        if !current.successors().contains(&requested) {
            return Err(StateError::InvalidTransition {
                from: current.to_string(),
                to: requested.to_string(),
            });
        }

        // Assignment is the one forward edge reserved to admins; every other
        // listed edge is open to the assigned engineer as well.
        if requested == JobStatus::AssignedToEngineer && role != UserRole::Admin {
            return Err(StateError::InvalidTransition {
                from: current.to_string(),
                to: requested.to_string(),
            });
        }

        if requested.requires_lab_consent() && lab_consent != Some(true) {
            return Err(StateError::GuardFailed(format!(
                "customer consent for lab is required to enter {}",
                requested
            )));
        }

        Ok(requested)
    }

    /// Check if a transition is allowed for the role, consent aside.
    pub fn is_transition_allowed(
        current: JobStatus,
        requested: JobStatus,
        role: UserRole,
    ) -> bool {
        Self::transition(current, requested, role, Some(true)).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
