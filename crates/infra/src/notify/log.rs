use async_trait::async_trait;

use super::{Notification, NotificationSender, NotifyError};

/// Sender used when no SMTP relay is configured: records the message in the
/// log and reports success.
#[derive(Debug, Default, Clone)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        notification.validate()?;
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "smtp not configured; notification logged only"
        );
        Ok(())
    }
}
