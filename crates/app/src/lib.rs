//! WellFix application composition root
//!
//! Composes all domain routers into a single application.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use wellfix_accounts::{AccountsRepositories, AccountsState};
use wellfix_auth::AuthBackend;
use wellfix_common::Config;
use wellfix_jobs::api::middleware::JobsState;
use wellfix_jobs::repository::PgJobStore;
use wellfix_jobs::service::JobWorkflowService;
use wellfix_notify::{NotificationSinkFactory, NotifyConfig};

/// Create the main application router with all routes and middleware
pub async fn create_app(config: Config, pool: PgPool) -> Result<Router, anyhow::Error> {
    let auth = AuthBackend::new(pool.clone());

    // Accounts domain
    let accounts_repos = AccountsRepositories::new(pool.clone());

    // Notification sink from environment-driven config
    let notify_config = NotifyConfig {
        provider: config.notify_provider.clone(),
        webhook_url: config.notify_webhook_url.clone(),
    };
    let sink = NotificationSinkFactory::create(notify_config)
        .map_err(|e| anyhow::anyhow!("Failed to create notification sink: {e}"))?;

    // Jobs domain: workflow service over the Postgres store and the
    // accounts-domain collaborator ports
    let service = JobWorkflowService::new(
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(accounts_repos.users.clone()),
        Arc::new(accounts_repos.addresses.clone()),
        Arc::new(accounts_repos.service_areas.clone()),
        Arc::from(sink),
    );

    let jobs_state = JobsState {
        service: Arc::new(service),
        auth: auth.clone(),
    };
    let accounts_state = AccountsState {
        repos: accounts_repos,
        auth,
    };

    // Build router — compose domain routers with shared infrastructure routes
    let app = Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/", axum::routing::get(|| async { "WellFix API v0.1.0" }))
        .merge(wellfix_jobs::api::routes::routes().with_state(jobs_state))
        .merge(wellfix_accounts::routes().with_state(accounts_state));

    Ok(app)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
