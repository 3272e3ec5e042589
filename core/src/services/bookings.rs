//! Booking reads, owner edits and deletions.

use super::Repositories;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::types::{Actor, Booking, BookingDetails, BookingId};

/// The only booking fields an owner or administrator may edit directly.
///
/// Payment status, amounts, owner and event belong to the reservation and
/// reconciliation paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingChanges {
    /// New ticket count
    pub tickets: Option<u32>,
}

/// Result of deleting a booking
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cancellation {
    /// The booking as it was
    pub booking: Booking,
    /// Tickets returned to inventory (zero unless it was completed)
    pub refunded: u32,
}

/// Booking reads and edits
#[derive(Clone)]
pub struct BookingService {
    repos: Repositories,
    ledger: InventoryLedger,
}

impl BookingService {
    /// Create the service
    #[must_use]
    pub fn new(repos: Repositories, ledger: InventoryLedger) -> Self {
        Self { repos, ledger }
    }

    /// The actor's bookings, or everyone's for an administrator; newest first
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list(&self, actor: &Actor) -> ServiceResult<Vec<BookingDetails>> {
        let owner = if actor.is_admin() { None } else { Some(actor.user_id) };
        Ok(self.repos.bookings.list_bookings(owner).await?)
    }

    /// One booking with event and booker populated
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized` unless owner or administrator.
    pub async fn get(&self, actor: &Actor, booking_id: BookingId) -> ServiceResult<BookingDetails> {
        let details = self
            .repos
            .bookings
            .find_booking_details(booking_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking", booking_id))?;
        if !actor.can_access(details.booking.user_id) {
            return Err(ServiceError::unauthorized());
        }
        Ok(details)
    }

    /// Apply whitelisted edits. Changing the ticket count is only possible
    /// while the booking is pending and no payment order exists; the total is
    /// recomputed from the price captured at booking time.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Unauthorized`
    /// - `ValidationFailed` for a zero count or a booking that is no longer editable
    /// - `InsufficientInventory` if the new count exceeds availability
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn update(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        changes: BookingChanges,
    ) -> ServiceResult<BookingDetails> {
        let current = self.get(actor, booking_id).await?;

        if let Some(tickets) = changes.tickets {
            if tickets == 0 {
                return Err(ServiceError::invalid("tickets", "Please specify at least 1 ticket"));
            }
            if !current.booking.is_editable() {
                return Err(ServiceError::invalid(
                    "tickets",
                    "Tickets can only be changed while the booking is pending and unpaid",
                ));
            }
            if tickets != current.booking.tickets {
                self.ledger.reserve(current.booking.event_id, tickets).await?;
                if self.repos.bookings.retick_booking(booking_id, tickets).await?.is_none() {
                    return Err(ServiceError::invalid(
                        "tickets",
                        "Tickets can only be changed while the booking is pending and unpaid",
                    ));
                }
                tracing::info!(%booking_id, from = current.booking.tickets, to = tickets, "Booking tickets changed");
            }
        }

        self.get(actor, booking_id).await
    }

    /// Delete a booking. A completed booking's tickets go back to inventory;
    /// a pending or failed one never took any.
    ///
    /// # Errors
    ///
    /// `NotFound`; `Unauthorized` unless owner or administrator.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, booking_id: BookingId) -> ServiceResult<Cancellation> {
        let booking = self
            .repos
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking", booking_id))?;
        if !actor.can_access(booking.user_id) {
            return Err(ServiceError::unauthorized());
        }

        let receipt = self.ledger.cancel(booking_id).await?;
        let refunded = receipt.inventory.map_or(0, |change| change.moved());
        let booking = receipt.booking.unwrap_or(booking);

        tracing::info!(
            %booking_id,
            status = %booking.payment_status,
            refunded,
            "Booking deleted"
        );
        Ok(Cancellation { booking, refunded })
    }
}
