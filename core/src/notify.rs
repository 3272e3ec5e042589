//! Notification collaborator.
//!
//! E-mail is best effort. Booking and payment state is the source of truth; a
//! failed send is logged and counted, never returned to the caller.

use crate::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// A rendered message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Delivery failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Recipient or sender address unusable
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The transport failed
    #[error("Delivery failed: {0}")]
    Transport(String),
}

/// Something that can deliver a [`Notification`]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    ///
    /// Any [`NotifyError`]; callers go through [`Notifications`], which
    /// swallows them.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Fire-and-forget front end over a [`Notifier`]
#[derive(Clone)]
pub struct Notifications {
    notifier: Arc<dyn Notifier>,
}

impl Notifications {
    /// Wrap a notifier
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send in the background; the caller does not wait.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    deliver_with(notifier.as_ref(), &notification).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    recipient = %notification.recipient,
                    subject = %notification.subject,
                    "No async runtime; notification dropped"
                );
                metrics::record_notification_failed();
            }
        }
    }
}

async fn deliver_with(notifier: &dyn Notifier, notification: &Notification) {
    match notifier.send(notification).await {
        Ok(()) => {
            tracing::debug!(
                recipient = %notification.recipient,
                subject = %notification.subject,
                "Notification sent"
            );
        }
        Err(error) => {
            tracing::warn!(
                recipient = %notification.recipient,
                subject = %notification.subject,
                error = %error,
                "Notification failed"
            );
            metrics::record_notification_failed();
        }
    }
}
