use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use super::{Notification, NotificationSender, NotifyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpSettings {
    fn validate(&self) -> Result<(), NotifyError> {
        if self.host.trim().is_empty() {
            return Err(NotifyError::Config("missing smtp host".to_string()));
        }
        if self.port == 0 {
            return Err(NotifyError::Config("invalid smtp port".to_string()));
        }
        if self.from.trim().is_empty() {
            return Err(NotifyError::Config("missing from address".to_string()));
        }
        if self.username.trim().is_empty() ^ self.password.trim().is_empty() {
            return Err(NotifyError::Config(
                "set both smtp user and password, or leave both empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// STARTTLS relay sender. Delivery runs on the blocking pool.
#[derive(Clone)]
pub struct SmtpSender {
    from: Mailbox,
    transport: SmtpTransport,
}

impl std::fmt::Debug for SmtpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSender").field("from", &self.from).finish_non_exhaustive()
    }
}

impl SmtpSender {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        settings.validate()?;

        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|_| NotifyError::Config("invalid from address".to_string()))?;

        let mut builder = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Config(format!("invalid smtp host: {e}")))?
            .port(settings.port);

        if !settings.username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let to: Mailbox = notification
            .to
            .parse()
            .map_err(|_| NotifyError::Invalid("invalid recipient address".to_string()))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.clone());

        let message = match &notification.html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                notification.text_body.clone(),
                html.clone(),
            )),
            None => builder.body(notification.text_body.clone()),
        };
        message.map_err(|e| NotifyError::Invalid(format!("failed to build email: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        notification.validate()?;
        let message = self.build_message(notification)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .map_err(|e| {
                tracing::warn!(error = %e, "smtp send failed");
                NotifyError::Transport(e.to_string())
            })?;
        Ok(())
    }
}
