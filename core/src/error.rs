//! Service error taxonomy.
//!
//! Every service operation returns [`ServiceResult`]. The web layer maps each
//! variant to an HTTP status; nothing here knows about HTTP.

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::types::PaymentStatus;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single field-level validation failure
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Offending field, in request (camelCase) spelling
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    /// Build a field error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by the domain services
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Entity absent
    #[error("{resource} not found")]
    NotFound {
        /// Kind of entity
        resource: &'static str,
        /// Identifier looked up
        id: String,
    },

    /// Malformed input; detected before any mutation
    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    /// Missing credentials, wrong owner or wrong role
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but refused outright (e.g. registering as admin)
    #[error("{0}")]
    Forbidden(String),

    /// Not enough tickets left
    #[error("Only {available} tickets available")]
    InsufficientInventory {
        /// Tickets still for sale
        available: u32,
        /// Tickets asked for
        requested: u32,
    },

    /// Booking is already paid
    #[error("Booking already paid")]
    AlreadyPaid,

    /// Gateway capture did not succeed
    #[error("Payment not completed (status: {status})")]
    PaymentNotCompleted {
        /// Status reported by the provider
        status: String,
    },

    /// Reminder already sent for this booking
    #[error("Reminder already sent")]
    AlreadySent,

    /// Booking is not paid
    #[error("Booking is not paid")]
    NotPaid,

    /// Complimentary recipient has no account
    #[error("User not found. Please ask them to register first.")]
    UserNotFound {
        /// E-mail that was looked up
        email: String,
    },

    /// Request conflicts with existing state
    #[error("{0}")]
    Conflict(String),

    /// Booking is failed/refunded (or just expired) and can no longer be paid
    #[error("Booking is {status} and can no longer be paid")]
    BookingClosed {
        /// Its status
        status: PaymentStatus,
    },

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Payment provider failure
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Password hashing or token signing failure
    #[error(transparent)]
    Auth(#[from] ticketbooth_auth::AuthError),
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// `NotFound` for a resource
    pub fn not_found(resource: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// `ValidationFailed` with a single field
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed(vec![FieldError::new(field, message)])
    }

    /// The default `Unauthorized`
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Not authorized".to_string())
    }

    /// Whether this error is an internal fault rather than a caller mistake
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Gateway(_) | Self::Auth(_))
    }
}

/// Accumulates field errors so a request reports every problem at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    /// Start validating
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field` unless `ok`
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Record an unconditional failure
    pub fn fail(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    /// Finish
    ///
    /// # Errors
    ///
    /// `ValidationFailed` with everything recorded, if anything was.
    pub fn finish(&mut self) -> ServiceResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(std::mem::take(&mut self.errors)))
        }
    }
}

/// Minimal structural e-mail check: `local@domain.tld`, no whitespace
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn validator_collects_all_failures() {
        let result = Validator::new()
            .check(false, "name", "Please add a name")
            .check(true, "email", "unused")
            .check(false, "password", "Password must be at least 6 characters")
            .finish();
        match result {
            Err(ServiceError::ValidationFailed(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, ["name", "password"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane example@x.com"));
        assert!(!is_valid_email("jane@@example.com"));
    }

    #[test]
    fn insufficient_inventory_message_carries_count() {
        let err = ServiceError::InsufficientInventory { available: 0, requested: 1 };
        assert_eq!(err.to_string(), "Only 0 tickets available");
    }
}
