//! Job domain entities
//!
//! The `Job` aggregate owns every workflow invariant that can be checked
//! without I/O: state-machine integration, cost/payment stage gates, the
//! monotonic lab-consent flag, and append-only notes. The workflow service
//! layers authorization and persistence on top.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wellfix_auth::UserRole;
use wellfix_common::{Error, Result};

use crate::domain::state::{JobStateMachine, JobStatus, StateError};

/// Requested repair type, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "repair_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairType {
    OnSitePart,
    LabDiagnosis,
    LabChipLevel,
}

/// Payment status for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Waived,
}

/// Device details captured at job creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub reported_symptoms: String,
}

impl DeviceInfo {
    pub fn validate(&self) -> Result<()> {
        if self.manufacturer.trim().is_empty() || self.manufacturer.len() > 100 {
            return Err(Error::Validation(
                "Device manufacturer must be 1-100 characters".to_string(),
            ));
        }
        if self.model.trim().is_empty() || self.model.len() > 100 {
            return Err(Error::Validation(
                "Device model must be 1-100 characters".to_string(),
            ));
        }
        if let Some(serial) = &self.serial_number {
            if serial.len() > 100 {
                return Err(Error::Validation(
                    "Device serial number must be at most 100 characters".to_string(),
                ));
            }
        }
        if self.reported_symptoms.trim().is_empty() {
            return Err(Error::Validation(
                "Reported symptoms are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Job entity: the central aggregate tracking one repair request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
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

impl Job {
    /// Create a new job with validation
    pub fn new(
        customer_id: Uuid,
        address_id: Uuid,
        pincode: String,
        device: DeviceInfo,
        repair_type: RepairType,
    ) -> Result<Self> {
        device.validate()?;

        let now = Utc::now();
        Ok(Job {
            id: Uuid::new_v4(),
            customer_id,
            engineer_id: None,
            address_id,
            pincode,
            device_manufacturer: device.manufacturer,
            device_model: device.model,
            device_serial_number: device.serial_number,
            reported_symptoms: device.reported_symptoms,
            repair_type,
            status: JobStatus::default(),
            estimated_cost: None,
            final_cost: None,
            payment_status: PaymentStatus::default(),
            customer_consent_for_lab: false,
            engineer_notes: String::new(),
            admin_notes: String::new(),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check if job is terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Assign (or reassign) an engineer. Sets status to ASSIGNED_TO_ENGINEER.
    pub fn assign(&mut self, engineer_id: Uuid) -> Result<()> {
        if !matches!(
            self.status,
            JobStatus::PendingAssignment | JobStatus::AssignedToEngineer
        ) {
            return Err(Error::invalid_transition(
                self.status,
                JobStatus::AssignedToEngineer,
            ));
        }
        self.engineer_id = Some(engineer_id);
        self.status = JobStatus::AssignedToEngineer;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove the assigned engineer, reverting status to PENDING_ASSIGNMENT.
    pub fn unassign(&mut self) -> Result<()> {
        if self.status != JobStatus::AssignedToEngineer {
            return Err(Error::invalid_transition(
                self.status,
                JobStatus::PendingAssignment,
            ));
        }
        self.engineer_id = None;
        self.status = JobStatus::PendingAssignment;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a status transition through the state machine.
    ///
    /// Flips the lab-consent flag when the transition carries it; the flag
    /// never reverts.
    pub fn apply_status(
        &mut self,
        requested: JobStatus,
        role: UserRole,
        lab_consent: Option<bool>,
    ) -> Result<()> {
        let next = JobStateMachine::transition(self.status, requested, role, lab_consent)
            .map_err(|e| match e {
                StateError::InvalidTransition { .. } | StateError::TerminalState(_) => {
                    Error::invalid_transition(self.status, requested)
                }
                StateError::GuardFailed(msg) => Error::Validation(msg),
            })?;
        if next.requires_lab_consent() {
            self.customer_consent_for_lab = true;
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Append notes to the log owned by the actor's role. Pure append; prior
    /// notes are never rewritten.
    pub fn append_notes(&mut self, role: UserRole, notes: &str) -> Result<()> {
        if notes.trim().is_empty() {
            return Err(Error::Validation("Notes must not be empty".to_string()));
        }
        let log = match role {
            UserRole::Admin => &mut self.admin_notes,
            UserRole::Engineer => &mut self.engineer_notes,
            UserRole::Customer => {
                return Err(Error::Authorization(
                    "Customers cannot write job notes".to_string(),
                ))
            }
        };
        if !log.is_empty() {
            log.push('\n');
        }
        log.push_str(notes.trim());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set the estimated and/or final cost, gated by workflow stage.
    pub fn set_quote(
        &mut self,
        estimated_cost: Option<Decimal>,
        final_cost: Option<Decimal>,
    ) -> Result<()> {
        if estimated_cost.is_none() && final_cost.is_none() {
            return Err(Error::Validation(
                "A quote update must carry at least one cost".to_string(),
            ));
        }
        for cost in [estimated_cost, final_cost].into_iter().flatten() {
            if cost < Decimal::ZERO {
                return Err(Error::Validation("Costs cannot be negative".to_string()));
            }
        }
        if estimated_cost.is_some() && !self.status.quote_stage_reached() {
            return Err(Error::invalid_state(self.status));
        }
        if final_cost.is_some() && !self.status.settlement_stage_reached() {
            return Err(Error::invalid_state(self.status));
        }
        if let Some(estimated) = estimated_cost {
            self.estimated_cost = Some(estimated);
        }
        if let Some(final_cost) = final_cost {
            self.final_cost = Some(final_cost);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Set the payment status, gated by workflow stage.
    pub fn set_payment(&mut self, payment_status: PaymentStatus) -> Result<()> {
        if !self.status.settlement_stage_reached() {
            return Err(Error::invalid_state(self.status));
        }
        self.payment_status = payment_status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancel the job, storing the reason irreversibly.
    pub fn cancel(&mut self, reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(Error::Validation(
                "A cancellation reason is required".to_string(),
            ));
        }
        if !self.status.is_cancellable() {
            return Err(Error::invalid_transition(self.status, JobStatus::Cancelled));
        }
        self.status = JobStatus::Cancelled;
        self.cancellation_reason = Some(reason.trim().to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<()> {
        // engineer_id is non-null iff the job has been assigned; cancellation
        // keeps whatever assignment state it had
        match self.status {
            JobStatus::PendingAssignment => {
                if self.engineer_id.is_some() {
                    return Err(Error::Validation(
                        "Unassigned jobs must not carry an engineer".to_string(),
                    ));
                }
            }
            JobStatus::Cancelled => {}
            _ => {
                if self.engineer_id.is_none() {
                    return Err(Error::Validation(
                        "Assigned-stage jobs must carry an engineer".to_string(),
                    ));
                }
            }
        }

        if self.final_cost.is_some() && !self.status.settlement_stage_reached() {
            return Err(Error::Validation(
                "Final cost is only set at the settlement stage".to_string(),
            ));
        }

        if matches!(self.payment_status, PaymentStatus::Paid | PaymentStatus::Waived)
            && !self.status.settlement_stage_reached()
        {
            return Err(Error::Validation(
                "Payment can only settle at the settlement stage".to_string(),
            ));
        }

        match (self.status, &self.cancellation_reason) {
            (JobStatus::Cancelled, None) => {
                return Err(Error::Validation(
                    "Cancelled jobs must carry a cancellation reason".to_string(),
                ));
            }
            (status, Some(_)) if status != JobStatus::Cancelled => {
                return Err(Error::Validation(
                    "Only cancelled jobs carry a cancellation reason".to_string(),
                ));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Rating entity: at most one per completed job, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub engineer_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// Create a rating for a completed job, denormalizing the engineer.
    pub fn new(job: &Job, score: i16, comment: Option<String>) -> Result<Self> {
        if job.status != JobStatus::Completed {
            return Err(Error::invalid_state(job.status));
        }
        if !(1..=5).contains(&score) {
            return Err(Error::Validation(
                "Rating score must be between 1 and 5".to_string(),
            ));
        }
        let engineer_id = job.engineer_id.ok_or_else(|| {
            Error::Internal("Completed job has no engineer to rate".to_string())
        })?;

        Ok(Rating {
            id: Uuid::new_v4(),
            job_id: job.id,
            customer_id: job.customer_id,
            engineer_id,
            score,
            comment,
            created_at: Utc::now(),
        })
    }
}

/// Append-only audit record of a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobHistoryEntry {
    pub id: Uuid,
    pub job_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub previous_status: Option<JobStatus>,
    pub new_status: JobStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobHistoryEntry {
    pub fn new(
        job_id: Uuid,
        actor_id: Option<Uuid>,
        previous_status: Option<JobStatus>,
        new_status: JobStatus,
        notes: Option<String>,
    ) -> Self {
        JobHistoryEntry {
            id: Uuid::new_v4(),
            job_id,
            actor_id,
            previous_status,
            new_status,
            notes,
            created_at: Utc::now(),
        }
    }
}
