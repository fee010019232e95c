//! SMTP delivery of notifications

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};

use super::{NotificationError, Notifier};

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP server host
    pub smtp_host: String,

    /// SMTP server port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username; empty for unauthenticated local relays
    #[serde(default)]
    pub smtp_user: String,

    /// SMTP password (should come from the environment)
    #[serde(default)]
    pub smtp_password: String,

    /// From address; defaults to the SMTP user
    #[serde(default)]
    pub from: String,

    /// Where new-comment notifications go
    #[serde(default)]
    pub notification_target: String,
}

fn default_smtp_port() -> u16 {
    465
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from: "comments@localhost".to_string(),
            notification_target: String::new(),
        }
    }
}

impl EmailConfig {
    /// Delivery needs a host and a recipient.
    pub fn is_enabled(&self) -> bool {
        !self.smtp_host.is_empty() && !self.notification_target.is_empty()
    }

    fn from_address(&self) -> &str {
        if self.from.is_empty() {
            &self.smtp_user
        } else {
            &self.from
        }
    }
}

/// SMTP notifier
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, text: &str) -> Result<Message, NotificationError> {
        Message::builder()
            .from(
                self.config
                    .from_address()
                    .parse()
                    .map_err(|e| NotificationError::InvalidAddress(format!("from: {}", e)))?,
            )
            .to(self
                .config
                .notification_target
                .parse()
                .map_err(|e| NotificationError::InvalidAddress(format!("to: {}", e)))?)
            .subject("New Comment Notification")
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .map_err(|e| NotificationError::Build(e.to_string()))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
        if self.config.smtp_user.is_empty() {
            // No authentication (for local development SMTP servers)
            return Ok(
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
                    .port(self.config.smtp_port)
                    .build(),
            );
        }

        let creds = Credentials::new(
            self.config.smtp_user.clone(),
            self.config.smtp_password.clone(),
        );
        Ok(AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| NotificationError::Delivery(format!("SMTP relay error: {}", e)))?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        let message = self.build_message(text)?;
        self.transport()?
            .send(message)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        tracing::info!(to = %self.config.notification_target, "notification sent");
        Ok(())
    }
}
