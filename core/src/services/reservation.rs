//! Reservation Service: creates pending regular bookings.
//!
//! Availability is checked but not held. Inventory only moves when the payment
//! is reconciled, so two pending bookings may together ask for more tickets
//! than remain; the confirm path re-checks before money moves.

use super::Repositories;
use crate::environment::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::metrics;
use crate::notify::Notifications;
use crate::templates;
use crate::types::{Actor, Booking, BookingType, EventId, PaymentStatus};
use chrono::Duration;
use std::sync::Arc;

/// Creates pending bookings
#[derive(Clone)]
pub struct ReservationService {
    repos: Repositories,
    ledger: InventoryLedger,
    notifications: Notifications,
    clock: Arc<dyn Clock>,
    pending_ttl: Duration,
}

impl ReservationService {
    /// Create the service
    #[must_use]
    pub fn new(
        repos: Repositories,
        ledger: InventoryLedger,
        notifications: Notifications,
        clock: Arc<dyn Clock>,
        pending_ttl: Duration,
    ) -> Self {
        Self {
            repos,
            ledger,
            notifications,
            clock,
            pending_ttl,
        }
    }

    /// Create a pending regular booking for the acting user.
    ///
    /// Does not touch inventory. Sends a best-effort "complete your payment"
    /// e-mail.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `tickets` is zero
    /// - `NotFound` if the event does not exist
    /// - `InsufficientInventory` carrying the current count
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn create_booking(&self, actor: &Actor, event_id: EventId, tickets: u32) -> ServiceResult<Booking> {
        if tickets == 0 {
            return Err(ServiceError::invalid("tickets", "Please specify at least 1 ticket"));
        }

        let event = self
            .repos
            .events
            .find_event(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;

        self.ledger.reserve(event_id, tickets).await?;

        let booking = Booking::pending(
            actor.user_id,
            event_id,
            tickets,
            event.price,
            self.clock.now(),
            self.pending_ttl,
        )
        .ok_or_else(|| ServiceError::invalid("tickets", "Booking total is too large"))?;

        self.repos.bookings.insert_booking(&booking).await?;
        metrics::record_booking_created(BookingType::Regular, PaymentStatus::Pending);

        tracing::info!(
            booking_id = %booking.id,
            event_id = %event_id,
            tickets,
            total_cents = booking.total_amount.cents(),
            "Pending booking created"
        );

        match self.repos.users.find_user(actor.user_id).await {
            Ok(Some(user)) => {
                self.notifications
                    .dispatch(templates::payment_pending(&user.summary(), &event, &booking));
            }
            Ok(None) => tracing::warn!(user_id = %actor.user_id, "Booker not found; skipping notification"),
            Err(error) => tracing::warn!(error = %error, "Could not load booker; skipping notification"),
        }

        Ok(booking)
    }
}
