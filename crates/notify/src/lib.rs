//! WellFix notification sink
//!
//! Outbound notifications for workflow events with support for:
//! - Webhook HTTP delivery for production (email/in-app fan-out happens
//!   downstream of the webhook receiver)
//! - Mock sink for testing and development
//!
//! Delivery is best-effort by contract: callers log failures and never
//! propagate them into the originating workflow operation.

pub mod client;
pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notify configuration error: {0}")]
    Configuration(String),

    #[error("Notify request error: {0}")]
    Request(String),

    #[error("Notify response error: {0}")]
    Response(String),
}

/// A workflow notification to deliver.
///
/// `event` is a dotted event name (`job.created`, `job.status_changed`, …);
/// `data` carries a snapshot of the job at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub event: String,
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Notification sink configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Sink provider (webhook, mock)
    pub provider: String,
    /// Destination URL for the webhook provider
    pub webhook_url: String,
}

impl NotifyConfig {
    /// Create notify config from environment variables.
    pub fn from_env() -> Result<Self, NotifyError> {
        let provider = std::env::var("NOTIFY_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let webhook_url = std::env::var("NOTIFY_WEBHOOK_URL").unwrap_or_default();

        if provider != "mock" && webhook_url.is_empty() {
            return Err(NotifyError::Configuration(
                "NOTIFY_WEBHOOK_URL is required for the webhook provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            webhook_url,
        })
    }
}

/// Notification sink trait for different implementations.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a single notification.
    async fn emit(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Factory for creating NotificationSink implementations.
pub struct NotificationSinkFactory;

impl NotificationSinkFactory {
    /// Create a NotificationSink based on configuration.
    pub fn create(config: NotifyConfig) -> Result<Box<dyn NotificationSink>, NotifyError> {
        match config.provider.as_str() {
            "webhook" => {
                tracing::info!("Creating webhook notification sink");
                if config.webhook_url.is_empty() {
                    return Err(NotifyError::Configuration(
                        "NOTIFY_WEBHOOK_URL is required for the webhook provider".to_string(),
                    ));
                }
                Ok(Box::new(client::WebhookSink::new(config)))
            }
            "mock" => {
                tracing::info!("Creating mock notification sink");
                Ok(Box::new(mock::MockSink::new()))
            }
            provider => Err(NotifyError::Configuration(format!(
                "Unknown notify provider: {}. Supported providers: webhook, mock",
                provider
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_mock_succeeds() {
        let config = NotifyConfig {
            provider: "mock".to_string(),
            webhook_url: String::new(),
        };
        assert!(NotificationSinkFactory::create(config).is_ok());
    }

    #[test]
    fn test_factory_webhook_requires_url() {
        let config = NotifyConfig {
            provider: "webhook".to_string(),
            webhook_url: String::new(),
        };
        assert!(NotificationSinkFactory::create(config).is_err());
    }

    #[test]
    fn test_factory_webhook_succeeds() {
        let config = NotifyConfig {
            provider: "webhook".to_string(),
            webhook_url: "http://localhost:9999/hooks".to_string(),
        };
        assert!(NotificationSinkFactory::create(config).is_ok());
    }

    #[test]
    fn test_factory_unknown_provider() {
        let config = NotifyConfig {
            provider: "pigeon".to_string(),
            webhook_url: String::new(),
        };
        let err = match NotificationSinkFactory::create(config) {
            Err(e) => e,
            Ok(_) => panic!("Expected error for unknown provider"),
        };
        assert!(err.to_string().contains("Unknown notify provider: pigeon"));
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Notification::new(
            "job.created",
            serde_json::json!({"job_id": "123", "status": "PENDING_ASSIGNMENT"}),
        );
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["event"], "job.created");
        assert_eq!(json["data"]["job_id"], "123");
    }

    #[tokio::test]
    async fn test_mock_records_notifications() {
        let sink = mock::MockSink::new();
        sink.emit(Notification::new("job.created", serde_json::json!({})))
            .await
            .unwrap();
        sink.emit(Notification::new("job.assigned", serde_json::json!({})))
            .await
            .unwrap();

        let recorded = sink.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].event, "job.created");
        assert_eq!(recorded[1].event, "job.assigned");
    }

    #[tokio::test]
    async fn test_mock_forced_failure() {
        let sink = mock::MockSink::new();
        sink.fail_next();
        let result = sink
            .emit(Notification::new("job.created", serde_json::json!({})))
            .await;
        assert!(result.is_err());
        // Subsequent emissions succeed again
        assert!(sink
            .emit(Notification::new("job.created", serde_json::json!({})))
            .await
            .is_ok());
    }
}
