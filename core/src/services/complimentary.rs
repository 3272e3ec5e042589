//! Complimentary Issuance Service.
//!
//! Administrators grant complimentary or VIP tickets to an existing account.
//! There is no payment round trip, so the booking insert and the inventory
//! commit are one ledger entry.

use super::Repositories;
use crate::environment::Clock;
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::ledger::InventoryLedger;
use crate::metrics;
use crate::notify::Notifications;
use crate::templates;
use crate::types::{Actor, Booking, BookingType, EventId, PaymentStatus};
use std::sync::Arc;

/// An administrator's grant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplimentaryRequest {
    /// Event to grant tickets for
    pub event_id: EventId,
    /// Recipient's registered e-mail
    pub user_email: String,
    /// Ticket count
    pub tickets: u32,
    /// `complimentary` or `vip`
    pub booking_type: BookingType,
}

/// Issues already-paid bookings
#[derive(Clone)]
pub struct ComplimentaryService {
    repos: Repositories,
    ledger: InventoryLedger,
    notifications: Notifications,
    clock: Arc<dyn Clock>,
}

impl ComplimentaryService {
    /// Create the service
    #[must_use]
    pub fn new(
        repos: Repositories,
        ledger: InventoryLedger,
        notifications: Notifications,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            ledger,
            notifications,
            clock,
        }
    }

    /// Issue a completed complimentary/VIP booking and commit its tickets.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` unless the actor is an administrator
    /// - `ValidationFailed` for a zero ticket count, a bad e-mail or a
    ///   `regular` booking type
    /// - `NotFound` if the event does not exist
    /// - `UserNotFound` if nobody is registered under the e-mail
    /// - `InsufficientInventory` carrying the current count
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id, tickets = request.tickets))]
    pub async fn issue(&self, actor: &Actor, request: ComplimentaryRequest) -> ServiceResult<Booking> {
        if !actor.is_admin() {
            return Err(ServiceError::unauthorized());
        }
        let email = request.user_email.trim().to_lowercase();
        Validator::new()
            .check(!email.is_empty(), "userEmail", "User email is required")
            .check(request.tickets >= 1, "tickets", "Please specify at least 1 ticket")
            .check(
                request.booking_type.is_issued(),
                "bookingType",
                "Booking type must be complimentary or vip",
            )
            .finish()?;

        let event = self
            .repos
            .events
            .find_event(request.event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", request.event_id))?;

        let user = self
            .repos
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound { email: email.clone() })?;

        self.ledger.reserve(event.id, request.tickets).await?;

        let booking = Booking::issued(
            user.id,
            event.id,
            request.tickets,
            event.price,
            request.booking_type,
            self.clock.now(),
        )
        .ok_or_else(|| ServiceError::invalid("tickets", "Booking total is too large"))?;

        let receipt = self.ledger.issue(booking.clone()).await?;
        let booking = receipt.booking.unwrap_or(booking);
        metrics::record_booking_created(booking.booking_type, PaymentStatus::Completed);

        tracing::info!(
            booking_id = %booking.id,
            recipient = %user.id,
            booking_type = %booking.booking_type,
            available_after = receipt.inventory.map(|c| c.after),
            issued_by = %actor.user_id,
            "Complimentary booking issued"
        );

        self.notifications
            .dispatch(templates::complimentary_granted(&user.summary(), &event, &booking));
        Ok(booking)
    }
}
