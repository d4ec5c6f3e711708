//! Authorization guard for job operations
//!
//! Capability model, not per-field ACLs: each role maps to a fixed set of
//! operation categories, narrowed per-call by ownership. The two layers are
//! evaluated in that order, capability first, so a non-owner
//! with the right role still reads as "forbidden" on mutations. Reads are
//! the exception: non-visible jobs read as "not found" so existence never
//! leaks.

use wellfix_auth::{AuthContext, UserRole};
use wellfix_common::{Error, Result};

use crate::domain::entities::Job;

/// Operation categories on a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Create,
    Assign,
    Unassign,
    StatusUpdate,
    AddNotes,
    Quote,
    Payment,
    Cancel,
    Rate,
}

impl JobAction {
    /// Role capability map, the first authorization layer.
    pub fn permitted_for(&self, role: UserRole) -> bool {
        match role {
            UserRole::Customer => matches!(
                self,
                JobAction::Create | JobAction::Cancel | JobAction::Rate
            ),
            UserRole::Engineer => matches!(
                self,
                JobAction::StatusUpdate
                    | JobAction::AddNotes
                    | JobAction::Quote
                    | JobAction::Payment
            ),
            UserRole::Admin => !matches!(self, JobAction::Create | JobAction::Rate),
        }
    }
}

impl std::fmt::Display for JobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobAction::Create => "create",
            JobAction::Assign => "assign",
            JobAction::Unassign => "unassign",
            JobAction::StatusUpdate => "status-update",
            JobAction::AddNotes => "add-notes",
            JobAction::Quote => "quote",
            JobAction::Payment => "payment",
            JobAction::Cancel => "cancel",
            JobAction::Rate => "rate",
        };
        write!(f, "{}", name)
    }
}

/// Role/ownership checks for job operations
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    /// Capability layer only, for operations with no existing job yet
    /// (creation) or where the admin-only check says it all.
    pub fn authorize(actor: &AuthContext, action: JobAction) -> Result<()> {
        if !action.permitted_for(actor.role()) {
            return Err(Error::Authorization(format!(
                "Role {} may not perform the {} operation",
                actor.role(),
                action
            )));
        }
        Ok(())
    }

    /// Capability, then ownership, against a loaded job. Admins bypass the
    /// ownership layer.
    pub fn authorize_on(actor: &AuthContext, action: JobAction, job: &Job) -> Result<()> {
        Self::authorize(actor, action)?;

        if actor.is_admin() {
            return Ok(());
        }

        let owns = match actor.role() {
            UserRole::Customer => job.customer_id == actor.id(),
            UserRole::Engineer => job.engineer_id == Some(actor.id()),
            UserRole::Admin => true,
        };
        if !owns {
            return Err(Error::Authorization(format!(
                "Actor does not own this job for the {} operation",
                action
            )));
        }
        Ok(())
    }

    /// Read visibility: owner, assigned engineer, or admin. Callers map
    /// `false` to NotFound rather than Forbidden.
    pub fn can_view(actor: &AuthContext, job: &Job) -> bool {
        actor.is_admin()
            || job.customer_id == actor.id()
            || job.engineer_id == Some(actor.id())
    }
}
