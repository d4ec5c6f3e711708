//! Webhook sink implementation
//!
//! Real HTTP client that POSTs notifications to the configured webhook URL.

use crate::{Notification, NotificationSink, NotifyConfig, NotifyError};

/// Webhook HTTP sink for delivering notifications to a downstream dispatcher.
pub struct WebhookSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Create a new webhook sink from configuration.
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.webhook_url,
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookSink {
    async fn emit(&self, notification: Notification) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".to_string());
            return Err(NotifyError::Response(format!(
                "Webhook returned {}: {}",
                status, body
            )));
        }

        tracing::debug!(event = %notification.event, "Notification delivered");
        Ok(())
    }
}
