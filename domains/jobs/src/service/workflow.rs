//! Job workflow service
//!
//! One operation per business action. Every mutation follows the same
//! shape: authorize (capability, then ownership), validate against a loaded
//! snapshot, mutate the aggregate, persist conditionally on that snapshot,
//! then emit a best-effort notification. Validation and the write belong to
//! the same atomic unit via the store's conditional-write contract, so two
//! racing mutations can never both pass validation against stale state.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use wellfix_accounts::{AddressBook, ServiceAreaDirectory, UserDirectory};
use wellfix_auth::AuthContext;
use wellfix_common::{Error, Result};
use wellfix_notify::{Notification, NotificationSink};

use crate::domain::authorization::{AuthorizationGuard, JobAction};
use crate::domain::entities::{
    DeviceInfo, Job, JobHistoryEntry, PaymentStatus, Rating, RepairType,
};
use crate::domain::state::JobStatus;
use crate::repository::{JobFilter, JobStore};

/// Extra fields applied atomically with a status update
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusUpdateFields {
    pub customer_consent_for_lab: Option<bool>,
}

/// Orchestrates the repair-job workflow
pub struct JobWorkflowService {
    store: Arc<dyn JobStore>,
    users: Arc<dyn UserDirectory>,
    addresses: Arc<dyn AddressBook>,
    service_areas: Arc<dyn ServiceAreaDirectory>,
    notifier: Arc<dyn NotificationSink>,
}

impl JobWorkflowService {
    pub fn new(
        store: Arc<dyn JobStore>,
        users: Arc<dyn UserDirectory>,
        addresses: Arc<dyn AddressBook>,
        service_areas: Arc<dyn ServiceAreaDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            users,
            addresses,
            service_areas,
            notifier,
        }
    }

    /// Create a new repair job for the acting customer.
    pub async fn create_job(
        &self,
        actor: &AuthContext,
        address_id: Uuid,
        device: DeviceInfo,
        repair_type: RepairType,
    ) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Create)?;

        let address = self
            .addresses
            .find(address_id)
            .await
            .map_err(|e| Error::Dependency(format!("Address lookup failed: {e}")))?
            .ok_or_else(|| Error::NotFound("Address not found".to_string()))?;

        if !address.is_owned_by(actor.id()) {
            return Err(Error::Authorization(
                "Address does not belong to the customer".to_string(),
            ));
        }

        let serviced = self
            .service_areas
            .is_active(&address.pincode)
            .await
            .map_err(|e| Error::Dependency(format!("Service-area lookup failed: {e}")))?;
        if !serviced {
            return Err(Error::Validation(format!(
                "Pincode {} is not currently serviced",
                address.pincode
            )));
        }

        let job = Job::new(
            actor.id(),
            address_id,
            address.pincode,
            device,
            repair_type,
        )?;
        let history = JobHistoryEntry::new(
            job.id,
            Some(actor.id()),
            None,
            job.status,
            Some("Job created".to_string()),
        );
        let created = self.store.insert(&job, &history).await?;

        tracing::info!(job_id = %created.id, customer_id = %created.customer_id, "Job created");
        self.emit("job.created", &created).await;
        Ok(created)
    }

    /// Assign (or reassign) an engineer to a job. Admin only.
    pub async fn assign_engineer(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        engineer_id: Uuid,
    ) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Assign)?;
        let mut job = self.load(job_id).await?;

        let engineer = self
            .users
            .find(engineer_id)
            .await
            .map_err(|e| Error::Dependency(format!("User lookup failed: {e}")))?
            .ok_or_else(|| Error::NotFound("Engineer not found".to_string()))?;
        if !engineer.role.is_engineer() {
            return Err(Error::Validation(
                "Assignment target does not hold the ENGINEER role".to_string(),
            ));
        }
        if !engineer.is_active {
            return Err(Error::Validation(
                "Assignment target account is deactivated".to_string(),
            ));
        }

        let snapshot = job.updated_at;
        let previous = job.status;
        let reassignment = job.engineer_id.is_some();
        job.assign(engineer_id)?;

        let history = JobHistoryEntry::new(
            job.id,
            Some(actor.id()),
            Some(previous),
            job.status,
            Some(
                if reassignment {
                    "Engineer reassigned"
                } else {
                    "Engineer assigned"
                }
                .to_string(),
            ),
        );
        let updated = self.store.update(&job, snapshot, Some(&history)).await?;

        tracing::info!(job_id = %updated.id, engineer_id = %engineer_id, "Engineer assigned");
        self.emit("job.assigned", &updated).await;
        Ok(updated)
    }

    /// Remove the assigned engineer, reverting the job to PENDING_ASSIGNMENT.
    /// Admin only; valid only before any work has started.
    pub async fn unassign_engineer(&self, actor: &AuthContext, job_id: Uuid) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Unassign)?;
        let mut job = self.load(job_id).await?;

        let snapshot = job.updated_at;
        let previous = job.status;
        job.unassign()?;

        let history = JobHistoryEntry::new(
            job.id,
            Some(actor.id()),
            Some(previous),
            job.status,
            Some("Engineer unassigned".to_string()),
        );
        let updated = self.store.update(&job, snapshot, Some(&history)).await?;

        tracing::info!(job_id = %updated.id, "Engineer unassigned");
        self.emit("job.unassigned", &updated).await;
        Ok(updated)
    }

    /// Drive the job through the status state machine.
    pub async fn update_status(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        requested: JobStatus,
        notes: Option<String>,
        fields: StatusUpdateFields,
    ) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::StatusUpdate)?;
        let mut job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::StatusUpdate, &job)?;

        // Assignment and cancellation have dedicated operations; the
        // status-update path never reaches their states.
        if matches!(
            requested,
            JobStatus::AssignedToEngineer | JobStatus::PendingAssignment | JobStatus::Cancelled
        ) {
            return Err(Error::invalid_transition(job.status, requested));
        }

        // Consent is writable only as a side effect of the lab hand-off
        if fields.customer_consent_for_lab.is_some() && !requested.requires_lab_consent() {
            return Err(Error::Validation(
                "Lab consent can only accompany a lab hand-off transition".to_string(),
            ));
        }

        let snapshot = job.updated_at;
        let previous = job.status;
        job.apply_status(requested, actor.role(), fields.customer_consent_for_lab)?;
        if let Some(notes) = &notes {
            job.append_notes(actor.role(), notes)?;
        }

        let history =
            JobHistoryEntry::new(job.id, Some(actor.id()), Some(previous), job.status, notes);
        let updated = self.store.update(&job, snapshot, Some(&history)).await?;

        tracing::info!(
            job_id = %updated.id,
            from = %previous,
            to = %updated.status,
            "Job status updated"
        );
        self.emit("job.status_changed", &updated).await;
        Ok(updated)
    }

    /// Append notes to the actor's notes log without touching status.
    pub async fn add_notes(&self, actor: &AuthContext, job_id: Uuid, notes: &str) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::AddNotes)?;
        let mut job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::AddNotes, &job)?;

        let snapshot = job.updated_at;
        job.append_notes(actor.role(), notes)?;
        let updated = self.store.update(&job, snapshot, None).await?;
        Ok(updated)
    }

    /// Set the estimated and/or final cost, gated by workflow stage.
    pub async fn update_quote(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        estimated_cost: Option<Decimal>,
        final_cost: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Quote)?;
        let mut job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::Quote, &job)?;

        let snapshot = job.updated_at;
        job.set_quote(estimated_cost, final_cost)?;
        if let Some(notes) = &notes {
            job.append_notes(actor.role(), notes)?;
        }
        let updated = self.store.update(&job, snapshot, None).await?;

        tracing::info!(job_id = %updated.id, "Quote updated");
        self.emit("job.quote_updated", &updated).await;
        Ok(updated)
    }

    /// Record the payment outcome at the settlement stage.
    pub async fn update_payment(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        payment_status: PaymentStatus,
    ) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Payment)?;
        let mut job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::Payment, &job)?;

        let snapshot = job.updated_at;
        job.set_payment(payment_status)?;
        let updated = self.store.update(&job, snapshot, None).await?;

        tracing::info!(job_id = %updated.id, "Payment status updated");
        self.emit("job.payment_updated", &updated).await;
        Ok(updated)
    }

    /// Cancel a job while the repair has not physically started.
    pub async fn cancel_job(&self, actor: &AuthContext, job_id: Uuid, reason: &str) -> Result<Job> {
        AuthorizationGuard::authorize(actor, JobAction::Cancel)?;
        let mut job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::Cancel, &job)?;

        let snapshot = job.updated_at;
        let previous = job.status;
        job.cancel(reason)?;

        let history = JobHistoryEntry::new(
            job.id,
            Some(actor.id()),
            Some(previous),
            job.status,
            Some(reason.trim().to_string()),
        );
        let updated = self.store.update(&job, snapshot, Some(&history)).await?;

        tracing::info!(job_id = %updated.id, "Job cancelled");
        self.emit("job.cancelled", &updated).await;
        Ok(updated)
    }

    /// Submit the customer's one-and-only rating for a completed job.
    pub async fn submit_rating(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        score: i16,
        comment: Option<String>,
    ) -> Result<Rating> {
        AuthorizationGuard::authorize(actor, JobAction::Rate)?;
        let job = self.load(job_id).await?;
        AuthorizationGuard::authorize_on(actor, JobAction::Rate, &job)?;

        if self.store.find_rating(job_id).await?.is_some() {
            return Err(Error::Duplicate("Job already has a rating".to_string()));
        }

        let rating = Rating::new(&job, score, comment)?;
        let created = self.store.insert_rating(&rating).await?;

        tracing::info!(job_id = %job.id, score = score, "Rating submitted");
        self.emit("job.rated", &job).await;
        Ok(created)
    }

    /// Fetch a single job. Non-visible jobs read as NotFound.
    pub async fn get_job(&self, actor: &AuthContext, job_id: Uuid) -> Result<Job> {
        let job = self.load(job_id).await?;
        if !AuthorizationGuard::can_view(actor, &job) {
            return Err(Error::NotFound("Job not found".to_string()));
        }
        Ok(job)
    }

    /// Fetch a job's rating, under the same visibility rule as the job.
    pub async fn get_rating(&self, actor: &AuthContext, job_id: Uuid) -> Result<Rating> {
        let _ = self.get_job(actor, job_id).await?;
        self.store
            .find_rating(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Rating not found".to_string()))
    }

    /// List jobs visible to the actor. Customers see their own jobs,
    /// engineers their assigned ones, admins everything.
    pub async fn list_jobs(
        &self,
        actor: &AuthContext,
        mut filter: JobFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>> {
        match actor.role() {
            wellfix_auth::UserRole::Customer => filter.customer_id = Some(actor.id()),
            wellfix_auth::UserRole::Engineer => filter.engineer_id = Some(actor.id()),
            wellfix_auth::UserRole::Admin => {}
        }
        self.store.list(&filter, limit, offset).await
    }

    /// Fetch a job's status history, under the same visibility rule.
    pub async fn get_history(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
    ) -> Result<Vec<JobHistoryEntry>> {
        let _ = self.get_job(actor, job_id).await?;
        self.store.list_history(job_id).await
    }

    async fn load(&self, job_id: Uuid) -> Result<Job> {
        self.store
            .find(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    /// Best-effort notification. Failures are logged and discarded; the
    /// originating operation has already committed.
    async fn emit(&self, event: &str, job: &Job) {
        let data = match serde_json::to_value(job) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, job_id = %job.id, "Failed to serialize job snapshot");
                return;
            }
        };
        if let Err(e) = self.notifier.emit(Notification::new(event, data)).await {
            tracing::error!(error = %e, job_id = %job.id, event = event, "Failed to deliver notification");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use chrono::{DateTime, Utc};
    use wellfix_accounts::ports::memory::InMemoryAccounts;
    use wellfix_auth::{AuthIdentity, UserRole};
    use wellfix_notify::mock::MockSink;

    use crate::repository::InMemoryJobStore;

    fn actor(id: Uuid, role: UserRole) -> AuthContext {
        AuthContext::new(AuthIdentity {
            id,
            email: format!("{role}@example.com").to_lowercase(),
            name: None,
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    struct TestEnv {
        service: JobWorkflowService,
        accounts: InMemoryAccounts,
        sink: MockSink,
        store: InMemoryJobStore,
        customer: AuthContext,
        engineer: AuthContext,
        admin: AuthContext,
        address_id: Uuid,
    }

    fn env() -> TestEnv {
        let accounts = InMemoryAccounts::new();
        let customer_id = accounts.add_user(UserRole::Customer, true);
        let engineer_id = accounts.add_user(UserRole::Engineer, true);
        let admin_id = accounts.add_user(UserRole::Admin, true);
        let address_id = accounts.add_address(customer_id, "560001");
        accounts.set_area("560001", true);

        let store = InMemoryJobStore::new();
        let sink = MockSink::new();
        let service = JobWorkflowService::new(
            Arc::new(store.clone()),
            Arc::new(accounts.clone()),
            Arc::new(accounts.clone()),
            Arc::new(accounts.clone()),
            Arc::new(sink.clone()),
        );

        TestEnv {
            service,
            accounts,
            sink,
            store,
            customer: actor(customer_id, UserRole::Customer),
            engineer: actor(engineer_id, UserRole::Engineer),
            admin: actor(admin_id, UserRole::Admin),
            address_id,
        }
    }

    fn device() -> DeviceInfo {
        DeviceInfo {
            manufacturer: "Lenovo".to_string(),
            model: "ThinkPad T14".to_string(),
            serial_number: Some("SN-5678".to_string()),
            reported_symptoms: "Random shutdowns under load".to_string(),
        }
    }

    async fn create_job(env: &TestEnv) -> Job {
        env.service
            .create_job(&env.customer, env.address_id, device(), RepairType::OnSitePart)
            .await
            .unwrap()
    }

    async fn assigned_job(env: &TestEnv) -> Job {
        let job = create_job(env).await;
        env.service
            .assign_engineer(&env.admin, job.id, env.engineer.id())
            .await
            .unwrap()
    }

    /// Drive an assigned job through the given transitions as the engineer,
    /// supplying consent where the hand-off demands it.
    async fn advance(env: &TestEnv, job_id: Uuid, steps: &[JobStatus]) -> Job {
        let mut job = None;
        for step in steps {
            let fields = StatusUpdateFields {
                customer_consent_for_lab: step.requires_lab_consent().then_some(true),
            };
            job = Some(
                env.service
                    .update_status(&env.engineer, job_id, *step, None, fields)
                    .await
                    .unwrap(),
            );
        }
        job.expect("advance requires at least one step")
    }

    const LAB_PATH: [JobStatus; 12] = [
        JobStatus::EnRoute,
        JobStatus::OnSiteDiagnosis,
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
    ];

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_job_success() {
        let env = env();
        let job = create_job(&env).await;

        assert_eq!(job.status, JobStatus::PendingAssignment);
        assert_eq!(job.customer_id, env.customer.id());
        assert_eq!(job.pincode, "560001");
        assert!(job.engineer_id.is_none());

        let events = env.sink.recorded();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "job.created");

        let history = env.store.list_history(job.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].new_status, JobStatus::PendingAssignment);
        assert!(history[0].previous_status.is_none());
    }

    #[tokio::test]
    async fn test_create_job_address_not_owned() {
        let env = env();
        let other_customer = env.accounts.add_user(UserRole::Customer, true);
        let foreign_address = env.accounts.add_address(other_customer, "560001");

        let err = env
            .service
            .create_job(&env.customer, foreign_address, device(), RepairType::OnSitePart)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_create_job_unknown_address() {
        let env = env();
        let err = env
            .service
            .create_job(&env.customer, Uuid::new_v4(), device(), RepairType::OnSitePart)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_job_unserviced_pincode() {
        let env = env();
        let remote_address = env.accounts.add_address(env.customer.id(), "797112");

        let err = env
            .service
            .create_job(&env.customer, remote_address, device(), RepairType::LabDiagnosis)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("797112"));

        // Deactivated areas behave the same as unknown ones
        env.accounts.set_area("797112", false);
        let err = env
            .service
            .create_job(&env.customer, remote_address, device(), RepairType::LabDiagnosis)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_job_rejected_for_non_customers() {
        let env = env();
        for non_customer in [&env.engineer, &env.admin] {
            let err = env
                .service
                .create_job(non_customer, env.address_id, device(), RepairType::OnSitePart)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Authorization(_)));
        }
    }

    #[tokio::test]
    async fn test_create_job_malformed_device_info() {
        let env = env();
        let mut bad_device = device();
        bad_device.manufacturer = String::new();
        let err = env
            .service
            .create_job(&env.customer, env.address_id, bad_device, RepairType::OnSitePart)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_assign_engineer_success() {
        let env = env();
        let job = assigned_job(&env).await;

        assert_eq!(job.status, JobStatus::AssignedToEngineer);
        assert_eq!(job.engineer_id, Some(env.engineer.id()));

        let events = env.sink.recorded();
        assert_eq!(events.last().unwrap().event, "job.assigned");
    }

    #[tokio::test]
    async fn test_reassignment_keeps_assigned_status() {
        let env = env();
        let job = assigned_job(&env).await;
        let second_engineer = env.accounts.add_user(UserRole::Engineer, true);

        let updated = env
            .service
            .assign_engineer(&env.admin, job.id, second_engineer)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::AssignedToEngineer);
        assert_eq!(updated.engineer_id, Some(second_engineer));
    }

    #[tokio::test]
    async fn test_assign_requires_admin() {
        let env = env();
        let job = create_job(&env).await;

        for non_admin in [&env.customer, &env.engineer] {
            let err = env
                .service
                .assign_engineer(non_admin, job.id, env.engineer.id())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Authorization(_)));
        }
    }

    #[tokio::test]
    async fn test_assign_target_must_be_an_active_engineer() {
        let env = env();
        let job = create_job(&env).await;

        // Unknown target
        let err = env
            .service
            .assign_engineer(&env.admin, job.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Wrong role
        let err = env
            .service
            .assign_engineer(&env.admin, job.id, env.customer.id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Deactivated engineer
        let retired = env.accounts.add_user(UserRole::Engineer, false);
        let err = env
            .service
            .assign_engineer(&env.admin, job.id, retired)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_assign_rejected_after_work_started() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &[JobStatus::EnRoute]).await;

        let err = env
            .service
            .assign_engineer(&env.admin, job.id, env.engineer.id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_unassign_reverts_to_pending_assignment() {
        let env = env();
        let job = assigned_job(&env).await;

        let updated = env
            .service
            .unassign_engineer(&env.admin, job.id)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::PendingAssignment);
        assert!(updated.engineer_id.is_none());

        // Only admins may unassign
        let err = env
            .service
            .unassign_engineer(&env.engineer, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_unassign_rejected_once_en_route() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &[JobStatus::EnRoute]).await;

        let err = env
            .service
            .unassign_engineer(&env.admin, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    // ------------------------------------------------------------------
    // Status updates
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_update_status_denied_for_customers() {
        let env = env();
        let job = assigned_job(&env).await;

        let err = env
            .service
            .update_status(
                &env.customer,
                job.id,
                JobStatus::EnRoute,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_update_status_requires_assignment_ownership() {
        let env = env();
        let job = assigned_job(&env).await;
        let other_engineer = actor(
            env.accounts.add_user(UserRole::Engineer, true),
            UserRole::Engineer,
        );

        // Right role, wrong engineer: forbidden, not "not found"
        let err = env
            .service
            .update_status(
                &other_engineer,
                job.id,
                JobStatus::EnRoute,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        // Admins bypass ownership
        let updated = env
            .service
            .update_status(
                &env.admin,
                job.id,
                JobStatus::EnRoute,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::EnRoute);
    }

    #[tokio::test]
    async fn test_update_status_no_stage_skipping() {
        let env = env();
        let job = assigned_job(&env).await;

        let err = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::PendingPayment,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        // The error names both statuses so callers can self-correct
        let message = err.to_string();
        assert!(message.contains("ASSIGNED_TO_ENGINEER"));
        assert!(message.contains("PENDING_PAYMENT"));
    }

    #[tokio::test]
    async fn test_update_status_cannot_reach_reserved_states() {
        let env = env();
        let job = assigned_job(&env).await;

        for reserved in [
            JobStatus::Cancelled,
            JobStatus::AssignedToEngineer,
            JobStatus::PendingAssignment,
        ] {
            let err = env
                .service
                .update_status(
                    &env.admin,
                    job.id,
                    reserved,
                    None,
                    StatusUpdateFields::default(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidState { .. }));
        }
    }

    #[tokio::test]
    async fn test_escalation_requires_consent() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &[JobStatus::EnRoute, JobStatus::OnSiteDiagnosis]).await;

        // Missing consent
        let err = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::EscalatedToLab,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Explicitly declined consent
        let err = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::EscalatedToLab,
                None,
                StatusUpdateFields {
                    customer_consent_for_lab: Some(false),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Consent supplied in the same call
        let updated = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::EscalatedToLab,
                None,
                StatusUpdateFields {
                    customer_consent_for_lab: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::EscalatedToLab);
        assert!(updated.customer_consent_for_lab);
    }

    #[tokio::test]
    async fn test_consent_rejected_on_non_lab_transitions() {
        let env = env();
        let job = assigned_job(&env).await;

        let err = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::EnRoute,
                None,
                StatusUpdateFields {
                    customer_consent_for_lab: Some(true),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_update_notes_route_by_role() {
        let env = env();
        let job = assigned_job(&env).await;

        let updated = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::EnRoute,
                Some("Leaving workshop".to_string()),
                StatusUpdateFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.engineer_notes, "Leaving workshop");
        assert!(updated.admin_notes.is_empty());

        let updated = env
            .service
            .update_status(
                &env.admin,
                job.id,
                JobStatus::OnSiteDiagnosis,
                Some("Confirmed by phone".to_string()),
                StatusUpdateFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(updated.engineer_notes, "Leaving workshop");
        assert_eq!(updated.admin_notes, "Confirmed by phone");
    }

    #[tokio::test]
    async fn test_add_notes_appends_without_status_change() {
        let env = env();
        let job = assigned_job(&env).await;

        let updated = env
            .service
            .add_notes(&env.engineer, job.id, "Ordered replacement fan")
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::AssignedToEngineer);
        assert_eq!(updated.engineer_notes, "Ordered replacement fan");

        let updated = env
            .service
            .add_notes(&env.engineer, job.id, "Fan arrived")
            .await
            .unwrap();
        assert_eq!(updated.engineer_notes, "Ordered replacement fan\nFan arrived");

        // No history entries beyond creation + assignment
        let history = env.store.list_history(job.id).await.unwrap();
        assert_eq!(history.len(), 2);

        // Customers cannot write notes
        let err = env
            .service
            .add_notes(&env.customer, job.id, "please hurry")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    // ------------------------------------------------------------------
    // Quotes & payment
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_quote_stage_gates() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &[JobStatus::EnRoute, JobStatus::OnSiteDiagnosis]).await;
        let cost = Decimal::new(120_000, 2); // 1200.00

        // Estimated cost before LAB_DIAGNOSIS
        let err = env
            .service
            .update_quote(&env.engineer, job.id, Some(cost), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        advance(
            &env,
            job.id,
            &[
                JobStatus::EscalatedToLab,
                JobStatus::PendingPickupForLab,
                JobStatus::InTransitToLab,
                JobStatus::LabDiagnosis,
            ],
        )
        .await;

        // Final cost while still in LAB_DIAGNOSIS
        let err = env
            .service
            .update_quote(&env.engineer, job.id, None, Some(cost), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        // Estimated cost is now legal
        let updated = env
            .service
            .update_quote(
                &env.engineer,
                job.id,
                Some(cost),
                None,
                Some("Motherboard reflow required".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.estimated_cost, Some(cost));
        assert!(updated.engineer_notes.contains("Motherboard reflow"));

        advance(
            &env,
            job.id,
            &[
                JobStatus::PendingQuoteApproval,
                JobStatus::RepairInProgressLab,
                JobStatus::PendingReturnDelivery,
                JobStatus::InTransitFromLab,
                JobStatus::PendingPayment,
            ],
        )
        .await;

        // Final cost at PENDING_PAYMENT succeeds
        let updated = env
            .service
            .update_quote(&env.engineer, job.id, None, Some(cost), None)
            .await
            .unwrap();
        assert_eq!(updated.final_cost, Some(cost));
    }

    #[tokio::test]
    async fn test_quote_requires_admin_or_assigned_engineer() {
        let env = env();
        let job = assigned_job(&env).await;
        let stranger = actor(
            env.accounts.add_user(UserRole::Engineer, true),
            UserRole::Engineer,
        );

        let err = env
            .service
            .update_quote(&stranger, job.id, Some(Decimal::ONE), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let err = env
            .service
            .update_quote(&env.customer, job.id, Some(Decimal::ONE), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_payment_stage_gate() {
        let env = env();
        let job = assigned_job(&env).await;

        let err = env
            .service
            .update_payment(&env.engineer, job.id, PaymentStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        advance(
            &env,
            job.id,
            &[
                JobStatus::EnRoute,
                JobStatus::OnSiteDiagnosis,
                JobStatus::RepairInProgressOnSite,
                JobStatus::PendingPayment,
            ],
        )
        .await;

        let updated = env
            .service
            .update_payment(&env.engineer, job.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);

        // Waiving is also legal at the settlement stage
        let updated = env
            .service
            .update_payment(&env.admin, job.id, PaymentStatus::Waived)
            .await
            .unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Waived);
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_cancel_from_pending_assignment() {
        let env = env();
        let job = create_job(&env).await;

        let cancelled = env
            .service
            .cancel_job(&env.customer, job.id, "Bought a new laptop instead")
            .await
            .unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("Bought a new laptop instead")
        );
        assert_eq!(env.sink.recorded().last().unwrap().event, "job.cancelled");

        let history = env.store.list_history(job.id).await.unwrap();
        assert_eq!(history.last().unwrap().new_status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_authorization() {
        let env = env();
        let job = create_job(&env).await;

        // A different customer cannot cancel someone else's job
        let stranger = actor(
            env.accounts.add_user(UserRole::Customer, true),
            UserRole::Customer,
        );
        let err = env
            .service
            .cancel_job(&stranger, job.id, "not mine")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        // Engineers cannot cancel at all
        let err = env
            .service
            .cancel_job(&env.engineer, job.id, "give up")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        // Admins can cancel on the customer's behalf
        let cancelled = env
            .service
            .cancel_job(&env.admin, job.id, "Customer requested by phone")
            .await
            .unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_rejected_once_repair_started() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(
            &env,
            job.id,
            &[
                JobStatus::EnRoute,
                JobStatus::OnSiteDiagnosis,
                JobStatus::RepairInProgressOnSite,
            ],
        )
        .await;

        let err = env
            .service
            .cancel_job(&env.customer, job.id, "changed my mind")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_closed() {
        let env = env();
        let job = create_job(&env).await;
        env.service
            .cancel_job(&env.customer, job.id, "no longer needed")
            .await
            .unwrap();

        // Cancelling twice
        let err = env
            .service
            .cancel_job(&env.customer, job.id, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        // Assignment after cancellation
        let err = env
            .service
            .assign_engineer(&env.admin, job.id, env.engineer.id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        // Status updates after cancellation
        let err = env
            .service
            .update_status(
                &env.admin,
                job.id,
                JobStatus::EnRoute,
                None,
                StatusUpdateFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_rating_lifecycle() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &LAB_PATH).await;

        let rating = env
            .service
            .submit_rating(&env.customer, job.id, 5, Some("Fast and tidy".to_string()))
            .await
            .unwrap();
        assert_eq!(rating.job_id, job.id);
        assert_eq!(rating.customer_id, env.customer.id());
        assert_eq!(rating.engineer_id, env.engineer.id());
        assert_eq!(rating.score, 5);

        // Retry yields Duplicate, idempotently
        let err = env
            .service
            .submit_rating(&env.customer, job.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        let fetched = env.service.get_rating(&env.customer, job.id).await.unwrap();
        assert_eq!(fetched.id, rating.id);
    }

    #[tokio::test]
    async fn test_rating_requires_completed_job() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &LAB_PATH[..11]).await; // stops at PENDING_PAYMENT

        let err = env
            .service
            .submit_rating(&env.customer, job.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_rating_authorization_and_bounds() {
        let env = env();
        let job = assigned_job(&env).await;
        advance(&env, job.id, &LAB_PATH).await;

        // Only the owning customer rates, admins included
        let err = env
            .service
            .submit_rating(&env.admin, job.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let stranger = actor(
            env.accounts.add_user(UserRole::Customer, true),
            UserRole::Customer,
        );
        let err = env
            .service
            .submit_rating(&stranger, job.id, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        // Score bounds
        for score in [0, 6] {
            let err = env
                .service
                .submit_rating(&env.customer, job.id, score, None)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    // ------------------------------------------------------------------
    // End-to-end scenario
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_lab_workflow_scenario() {
        let env = env();
        let job = create_job(&env).await;
        let job = env
            .service
            .assign_engineer(&env.admin, job.id, env.engineer.id())
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::AssignedToEngineer);

        let job = advance(&env, job.id, &LAB_PATH[..11]).await;
        assert_eq!(job.status, JobStatus::PendingPayment);
        assert!(job.customer_consent_for_lab);

        let job = env
            .service
            .update_quote(
                &env.engineer,
                job.id,
                Some(Decimal::new(250_000, 2)),
                Some(Decimal::new(240_000, 2)),
                None,
            )
            .await
            .unwrap();
        let job = env
            .service
            .update_payment(&env.engineer, job.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(job.payment_status, PaymentStatus::Paid);

        let job = env
            .service
            .update_status(
                &env.engineer,
                job.id,
                JobStatus::Completed,
                Some("Device returned to customer".to_string()),
                StatusUpdateFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let rating = env
            .service
            .submit_rating(&env.customer, job.id, 5, None)
            .await
            .unwrap();
        assert_eq!(rating.score, 5);

        // One history entry per status change: creation + assignment + 12 transitions
        let history = env.store.list_history(job.id).await.unwrap();
        assert_eq!(history.len(), 14);
        for pair in history.windows(2) {
            assert_eq!(Some(pair[0].new_status), pair[1].previous_status);
        }

        let events: Vec<String> = env.sink.recorded().iter().map(|n| n.event.clone()).collect();
        assert_eq!(events.first().map(String::as_str), Some("job.created"));
        assert!(events.contains(&"job.assigned".to_string()));
        assert!(events.contains(&"job.quote_updated".to_string()));
        assert!(events.contains(&"job.payment_updated".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("job.rated"));
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_job_visibility() {
        let env = env();
        let job = assigned_job(&env).await;

        assert!(env.service.get_job(&env.customer, job.id).await.is_ok());
        assert!(env.service.get_job(&env.engineer, job.id).await.is_ok());
        assert!(env.service.get_job(&env.admin, job.id).await.is_ok());

        // Non-owners read "not found", never "forbidden"
        let stranger = actor(
            env.accounts.add_user(UserRole::Customer, true),
            UserRole::Customer,
        );
        let err = env.service.get_job(&stranger, job.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let other_engineer = actor(
            env.accounts.add_user(UserRole::Engineer, true),
            UserRole::Engineer,
        );
        let err = env
            .service
            .get_job(&other_engineer, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_jobs_scoped_by_role() {
        let env = env();
        let mine = assigned_job(&env).await;

        // A second customer's job
        let other_customer_id = env.accounts.add_user(UserRole::Customer, true);
        let other_customer = actor(other_customer_id, UserRole::Customer);
        let other_address = env.accounts.add_address(other_customer_id, "560001");
        let theirs = env
            .service
            .create_job(&other_customer, other_address, device(), RepairType::LabChipLevel)
            .await
            .unwrap();

        let listed = env
            .service
            .list_jobs(&env.customer, JobFilter::default(), 20, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        // Engineers see only their assignments, even with a foreign filter
        let listed = env
            .service
            .list_jobs(
                &env.engineer,
                JobFilter {
                    engineer_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        // Admins see everything and may filter by counterpart
        let listed = env
            .service
            .list_jobs(&env.admin, JobFilter::default(), 20, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        let listed = env
            .service
            .list_jobs(
                &env.admin,
                JobFilter {
                    customer_id: Some(other_customer_id),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, theirs.id);

        let listed = env
            .service
            .list_jobs(
                &env.admin,
                JobFilter {
                    status: Some(JobStatus::AssignedToEngineer),
                    ..Default::default()
                },
                20,
                0,
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }

    #[tokio::test]
    async fn test_history_visibility() {
        let env = env();
        let job = assigned_job(&env).await;

        let history = env.service.get_history(&env.customer, job.id).await.unwrap();
        assert_eq!(history.len(), 2);

        let stranger = actor(
            env.accounts.add_user(UserRole::Customer, true),
            UserRole::Customer,
        );
        let err = env
            .service
            .get_history(&stranger, job.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // ------------------------------------------------------------------
    // Concurrency & best-effort notification
    // ------------------------------------------------------------------

    /// Store wrapper that serves a frozen pre-mutation snapshot from `find`,
    /// forcing two callers to validate against the same state the way truly
    /// concurrent requests do.
    struct StaleReadStore {
        inner: InMemoryJobStore,
        frozen: Mutex<Option<Job>>,
    }

    #[async_trait::async_trait]
    impl JobStore for StaleReadStore {
        async fn insert(&self, job: &Job, history: &JobHistoryEntry) -> Result<Job> {
            self.inner.insert(job, history).await
        }

        async fn find(&self, id: Uuid) -> Result<Option<Job>> {
            if let Some(frozen) = self.frozen.lock().unwrap().clone() {
                if frozen.id == id {
                    return Ok(Some(frozen));
                }
            }
            self.inner.find(id).await
        }

        async fn list(&self, filter: &JobFilter, limit: i64, offset: i64) -> Result<Vec<Job>> {
            self.inner.list(filter, limit, offset).await
        }

        async fn update(
            &self,
            job: &Job,
            expected_updated_at: DateTime<Utc>,
            history: Option<&JobHistoryEntry>,
        ) -> Result<Job> {
            self.inner.update(job, expected_updated_at, history).await
        }

        async fn list_history(&self, job_id: Uuid) -> Result<Vec<JobHistoryEntry>> {
            self.inner.list_history(job_id).await
        }

        async fn insert_rating(&self, rating: &Rating) -> Result<Rating> {
            self.inner.insert_rating(rating).await
        }

        async fn find_rating(&self, job_id: Uuid) -> Result<Option<Rating>> {
            self.inner.find_rating(job_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_assignments_exactly_one_wins() {
        let env = env();
        let racing_store = Arc::new(StaleReadStore {
            inner: env.store.clone(),
            frozen: Mutex::new(None),
        });
        let racing_service = JobWorkflowService::new(
            racing_store.clone(),
            Arc::new(env.accounts.clone()),
            Arc::new(env.accounts.clone()),
            Arc::new(env.accounts.clone()),
            Arc::new(env.sink.clone()),
        );

        let job = create_job(&env).await;
        // Both racers will now validate against the PENDING_ASSIGNMENT snapshot
        *racing_store.frozen.lock().unwrap() = Some(job.clone());

        let second_engineer = env.accounts.add_user(UserRole::Engineer, true);
        let (first, second) = tokio::join!(
            racing_service.assign_engineer(&env.admin, job.id, env.engineer.id()),
            racing_service.assign_engineer(&env.admin, job.id, second_engineer),
        );

        let outcomes = [first, second];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent assignment must win");

        let loser = outcomes.iter().find(|r| r.is_err()).unwrap();
        match loser {
            Err(Error::Conflict(_)) | Err(Error::InvalidState { .. }) => {}
            other => panic!("loser must see Conflict or InvalidState, got {other:?}"),
        }

        // The stored job carries exactly one of the two engineers
        let stored = env.store.find(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::AssignedToEngineer);
        assert!(
            stored.engineer_id == Some(env.engineer.id())
                || stored.engineer_id == Some(second_engineer)
        );
    }

    #[tokio::test]
    async fn test_notification_failure_never_fails_the_operation() {
        let env = env();
        env.sink.fail_next();
        let job = create_job(&env).await;
        assert_eq!(job.status, JobStatus::PendingAssignment);

        // The job landed despite the failed delivery
        assert!(env.store.find(job.id).await.unwrap().is_some());
        assert!(env.sink.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_failure_surfaces_distinctly() {
        // A service wired to a failing user directory reports Dependency,
        // not Validation, so callers know the input was plausibly valid.
        struct FailingDirectory;

        #[async_trait::async_trait]
        impl UserDirectory for FailingDirectory {
            async fn find(
                &self,
                _user_id: Uuid,
            ) -> Result<Option<wellfix_accounts::DirectoryUser>> {
                Err(Error::Internal("directory unreachable".to_string()))
            }
        }

        let env = env();
        let service = JobWorkflowService::new(
            Arc::new(env.store.clone()),
            Arc::new(FailingDirectory),
            Arc::new(env.accounts.clone()),
            Arc::new(env.accounts.clone()),
            Arc::new(env.sink.clone()),
        );

        let job = create_job(&env).await;
        let err = service
            .assign_engineer(&env.admin, job.id, env.engineer.id())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dependency(_)));
    }
}
