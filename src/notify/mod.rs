//! # New-Comment Notifications
//!
//! Fire-and-forget notification of the site owner. A failed notification is
//! logged by the caller and never fails the comment that triggered it.

mod email;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

pub use email::{EmailConfig, SmtpNotifier};

/// Notification delivery failure
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to deliver message: {0}")]
    Delivery(String),
}

/// Something that can tell the site owner about a new comment.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotificationError>;
}

/// Notifier used when no email transport is configured.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        tracing::debug!(chars = text.len(), "notification dropped: no transport configured");
        Ok(())
    }
}

/// Mock notifier for testing
#[derive(Debug, Default)]
pub struct MockNotifier {
    /// Texts passed to `notify`, delivered or not
    pub sent: Mutex<Vec<String>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Get number of notifications attempted
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        self.sent.lock().push(text.to_string());
        if self.fail {
            Err(NotificationError::Delivery("mock transport down".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Create a notifier based on config
pub fn create_notifier(config: Option<EmailConfig>) -> Arc<dyn Notifier> {
    match config {
        Some(cfg) if cfg.is_enabled() => Arc::new(SmtpNotifier::new(cfg)),
        _ => Arc::new(NullNotifier),
    }
}
