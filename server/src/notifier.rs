//! Notification delivery.
//!
//! [`SmtpNotifier`] sends HTML mail through an authenticated STARTTLS relay.
//! Without SMTP credentials the server falls back to [`ConsoleNotifier`],
//! which only logs what would have been sent.

use crate::config::EmailConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use ticketbooth_core::notify::{Notification, NotifyError, Notifier};

/// SMTP notifier using Lettre's async transport
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier").field("from", &self.from).finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// [`NotifyError::InvalidAddress`] when credentials are missing or the
    /// sender is not a valid mailbox, [`NotifyError::Transport`] when the relay
    /// cannot be set up.
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let (Some(user), Some(pass)) = (config.user.clone(), config.pass.clone()) else {
            return Err(NotifyError::InvalidAddress("EMAIL_USER and EMAIL_PASS must be set".to_string()));
        };

        let from = format!("{} <{user}>", config.from_name)
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("sender {user}: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(user, pass))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to = notification
            .recipient
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("{}: {e}", notification.recipient)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&notification.subject)
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())
            .map_err(|e| NotifyError::Transport(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(format!("Failed to send email: {e}")))?;

        tracing::info!(recipient = %notification.recipient, subject = %notification.subject, "Email sent");
        Ok(())
    }
}

/// Logs notifications instead of sending them (development)
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            body_len = notification.html_body.len(),
            "Email not configured; notification logged only"
        );
        Ok(())
    }
}

/// SMTP when configured, console otherwise
///
/// # Errors
///
/// See [`SmtpNotifier::from_config`].
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    if config.is_configured() {
        Ok(Arc::new(SmtpNotifier::from_config(config)?))
    } else {
        tracing::warn!("EMAIL_USER/EMAIL_PASS not set; notifications will only be logged");
        Ok(Arc::new(ConsoleNotifier))
    }
}
