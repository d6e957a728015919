//! Outbound notifications (welcome emails).

use async_trait::async_trait;
use thiserror::Error;

pub mod log;
pub mod smtp;
pub mod templates;

pub use log::LogSender;
pub use smtp::{SmtpSender, SmtpSettings};

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid notification: {0}")]
    Invalid(String),

    #[error("notifier misconfigured: {0}")]
    Config(String),

    #[error("delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

impl Notification {
    /// Recipient, subject and at least one body must be present.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.to.trim().is_empty() {
            return Err(NotifyError::Invalid("recipient is required".to_string()));
        }
        if self.subject.trim().is_empty() {
            return Err(NotifyError::Invalid("subject is required".to_string()));
        }
        if self.text_body.is_empty() && self.html_body.as_deref().is_none_or(str::is_empty) {
            return Err(NotifyError::Invalid("body is required".to_string()));
        }
        Ok(())
    }
}
