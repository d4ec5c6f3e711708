//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Notification delivery
    pub notify_provider: String,
    pub notify_webhook_url: String,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            notify_provider: env::var("NOTIFY_PROVIDER").unwrap_or_else(|_| "mock".to_string()),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").unwrap_or_default(),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "wellfix=debug".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        };

        Ok(config)
    }
}
