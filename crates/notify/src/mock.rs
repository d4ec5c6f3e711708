//! Mock notification sink
//!
//! Stores notifications in memory for test assertions.
//! Thread-safe via `Arc<Mutex<>>`.

use crate::{Notification, NotificationSink, NotifyError};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Mock sink that records notifications for test assertions.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
    fail_next: Arc<AtomicBool>,
}

impl MockSink {
    /// Create a new mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all recorded notifications.
    pub fn recorded(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notifications lock poisoned — prior test panicked")
            .clone()
    }

    /// Clear all recorded notifications.
    pub fn reset(&self) {
        self.notifications
            .lock()
            .expect("notifications lock poisoned — prior test panicked")
            .clear();
    }

    /// Make the next `emit` call fail, for exercising the best-effort path.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NotificationSink for MockSink {
    async fn emit(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(NotifyError::Request(
                "mock sink configured to fail".to_string(),
            ));
        }
        tracing::debug!(event = %notification.event, "Mock sink: recording notification");
        self.notifications
            .lock()
            .map_err(|e| NotifyError::Request(format!("notifications lock poisoned: {e}")))?
            .push(notification);
        Ok(())
    }
}
