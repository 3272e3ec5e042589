//! Payment gateway contract.
//!
//! The provider is remote, slow and fallible. Implementations live outside the
//! core (`PayPal`, a mock for development, scripted doubles for tests).

use crate::types::{BookingId, EventId, Money};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Payment provider failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Credentials or endpoint missing
    #[error("Payment gateway not configured: {0}")]
    NotConfigured(String),

    /// Network failure or timeout talking to the provider
    #[error("Payment gateway unreachable: {0}")]
    Transport(String),

    /// The provider answered with an error status
    #[error("Payment gateway rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status from the provider
        status: u16,
        /// Provider message
        message: String,
    },

    /// The provider's answer could not be understood
    #[error("Invalid payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Everything the provider needs to open an order for a booking
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRequest {
    /// Booking being paid (sent as the provider's custom id)
    pub booking_id: BookingId,
    /// Event (sent as the provider's reference id)
    pub event_id: EventId,
    /// Line description shown to the payer
    pub description: String,
    /// Exact amount to charge
    pub amount: Money,
}

/// An order opened with the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentOrder {
    /// Provider order id
    pub order_id: String,
    /// Where to send the payer to approve
    pub approval_url: String,
}

/// Terminal status of a capture
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Funds captured
    Completed,
    /// Approved by the payer and accepted by the provider
    Approved,
    /// Anything else the provider reported
    Other(String),
}

impl CaptureStatus {
    /// Map the provider's status string
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "COMPLETED" => Self::Completed,
            "APPROVED" => Self::Approved,
            _ => Self::Other(status.to_owned()),
        }
    }

    /// Only `COMPLETED` and `APPROVED` count as paid
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Approved)
    }

    /// Provider spelling
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Approved => "APPROVED",
            Self::Other(status) => status,
        }
    }
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment gateway adapter
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order for exactly `request.amount`
    ///
    /// # Errors
    ///
    /// Any [`GatewayError`].
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder, GatewayError>;

    /// Finalize a previously approved order
    ///
    /// # Errors
    ///
    /// Any [`GatewayError`]. A non-success status is not an error.
    async fn capture_order(&self, order_id: &str) -> Result<CaptureStatus, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses() {
        assert!(CaptureStatus::from_provider("COMPLETED").is_success());
        assert!(CaptureStatus::from_provider("approved").is_success());
        let declined = CaptureStatus::from_provider("DECLINED");
        assert!(!declined.is_success());
        assert_eq!(declined.as_str(), "DECLINED");
    }
}
