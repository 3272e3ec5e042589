//! Inventory Ledger.
//!
//! Holds the arithmetic that keeps `0 ≤ available ≤ total` for every event and
//! the service through which all inventory movement is requested.
//!
//! Regular bookings do not take inventory when they are created; only a
//! confirmed payment or an administrator-issued booking commits tickets. That
//! keeps abandoned payment flows from stranding stock, at the price of letting
//! concurrent pending bookings jointly exceed what is left. The commit floors
//! at zero and reports any shortfall so callers can flag oversold tickets.

use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use crate::store::{InventoryStore, LedgerEntry, LedgerOutcome, LedgerReceipt};
use crate::types::{Booking, BookingId, EventId};
use std::sync::Arc;

/// An event's ticket counters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inventory {
    /// Capacity
    pub total: u32,
    /// Still for sale
    pub available: u32,
}

impl Inventory {
    /// Build counters, clamping `available` into `0..=total`
    #[must_use]
    pub const fn new(total: u32, available: u32) -> Self {
        let available = if available > total { total } else { available };
        Self { total, available }
    }

    /// Whether `tickets` are still for sale
    #[must_use]
    pub const fn covers(&self, tickets: u32) -> bool {
        tickets <= self.available
    }

    /// Take `tickets`, flooring at zero
    #[must_use]
    pub const fn commit(self, event_id: EventId, tickets: u32) -> (Self, InventoryChange) {
        let after = self.available.saturating_sub(tickets);
        (
            Self {
                total: self.total,
                available: after,
            },
            InventoryChange {
                event_id,
                requested: tickets,
                before: self.available,
                after,
            },
        )
    }

    /// Return `tickets`, capping at capacity
    #[must_use]
    pub const fn refund(self, event_id: EventId, tickets: u32) -> (Self, InventoryChange) {
        let raised = self.available.saturating_add(tickets);
        let after = if raised > self.total { self.total } else { raised };
        (
            Self {
                total: self.total,
                available: after,
            },
            InventoryChange {
                event_id,
                requested: tickets,
                before: self.available,
                after,
            },
        )
    }
}

/// One movement of an event's available count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InventoryChange {
    /// Event that moved
    pub event_id: EventId,
    /// Tickets asked for
    pub requested: u32,
    /// Available before
    pub before: u32,
    /// Available after
    pub after: u32,
}

impl InventoryChange {
    /// Tickets that actually moved
    #[must_use]
    pub const fn moved(&self) -> u32 {
        self.before.abs_diff(self.after)
    }

    /// Tickets asked for that could not move (oversold on commit, or
    /// beyond capacity on refund)
    #[must_use]
    pub const fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.moved())
    }
}

/// Result of an availability check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Availability {
    /// Tickets for sale right now
    pub available: u32,
    /// Tickets asked for
    pub requested: u32,
}

impl Availability {
    /// Whether the request fits
    #[must_use]
    pub const fn is_sufficient(&self) -> bool {
        self.requested <= self.available
    }
}

/// The one place inventory moves through
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
}

impl InventoryLedger {
    /// Create a ledger over a store
    #[must_use]
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Current availability of an event for `requested` tickets
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist; store failures.
    pub async fn check_availability(&self, event_id: EventId, requested: u32) -> ServiceResult<Availability> {
        let inventory = self
            .store
            .inventory(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;
        Ok(Availability {
            available: inventory.available,
            requested,
        })
    }

    /// Precondition check before a booking or order is created. Mutates nothing.
    ///
    /// # Errors
    ///
    /// `InsufficientInventory` carrying the current count; `NotFound`.
    pub async fn reserve(&self, event_id: EventId, tickets: u32) -> ServiceResult<Availability> {
        let availability = self.check_availability(event_id, tickets).await?;
        if availability.is_sufficient() {
            Ok(availability)
        } else {
            Err(ServiceError::InsufficientInventory {
                available: availability.available,
                requested: tickets,
            })
        }
    }

    /// Take `tickets` from an event, flooring at zero.
    ///
    /// A clamped commit is not an error; inspect
    /// [`InventoryChange::shortfall`].
    ///
    /// # Errors
    ///
    /// `NotFound`; store failures.
    pub async fn commit(&self, event_id: EventId, tickets: u32) -> ServiceResult<InventoryChange> {
        let receipt = self.store.apply(LedgerEntry::Commit { event_id, tickets }).await?;
        let change = receipt
            .inventory
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;
        record_commit(&change);
        Ok(change)
    }

    /// Return `tickets` to an event, capped at its capacity
    ///
    /// # Errors
    ///
    /// `NotFound`; store failures.
    pub async fn refund(&self, event_id: EventId, tickets: u32) -> ServiceResult<InventoryChange> {
        let receipt = self.store.apply(LedgerEntry::Refund { event_id, tickets }).await?;
        let change = receipt
            .inventory
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;
        record_refund(&change);
        Ok(change)
    }

    /// Complete a booking and commit its tickets in one step. Re-applying it
    /// to a completed booking moves nothing.
    ///
    /// # Errors
    ///
    /// Store failures only; inspect the receipt outcome.
    pub async fn confirm_payment(&self, booking_id: BookingId, reference: String) -> ServiceResult<LedgerReceipt> {
        let receipt = self
            .store
            .apply(LedgerEntry::ConfirmPayment { booking_id, reference })
            .await?;
        if let Some(change) = &receipt.inventory {
            record_commit(change);
        }
        Ok(receipt)
    }

    /// Insert an already-completed booking and commit its tickets in one step
    ///
    /// # Errors
    ///
    /// `NotFound` if the event vanished; store failures.
    pub async fn issue(&self, booking: Booking) -> ServiceResult<LedgerReceipt> {
        let event_id = booking.event_id;
        let receipt = self.store.apply(LedgerEntry::IssueBooking { booking }).await?;
        if receipt.outcome == LedgerOutcome::Missing {
            return Err(ServiceError::not_found("Event", event_id));
        }
        if let Some(change) = &receipt.inventory {
            record_commit(change);
        }
        Ok(receipt)
    }

    /// Delete a booking, refunding its tickets when it was paid
    ///
    /// # Errors
    ///
    /// `NotFound` if the booking is gone; store failures.
    pub async fn cancel(&self, booking_id: BookingId) -> ServiceResult<LedgerReceipt> {
        let receipt = self.store.apply(LedgerEntry::CancelBooking { booking_id }).await?;
        if receipt.outcome == LedgerOutcome::Missing {
            return Err(ServiceError::not_found("Booking", booking_id));
        }
        if let Some(change) = &receipt.inventory {
            record_refund(change);
        }
        Ok(receipt)
    }
}

fn record_commit(change: &InventoryChange) {
    metrics::record_tickets_committed(change.moved());
    let oversold = change.shortfall();
    if oversold > 0 {
        tracing::warn!(
            event_id = %change.event_id,
            requested = change.requested,
            available_before = change.before,
            oversold,
            "Inventory commit clamped at zero; tickets oversold"
        );
        metrics::record_oversold(oversold);
    } else {
        tracing::debug!(
            event_id = %change.event_id,
            tickets = change.requested,
            available = change.after,
            "Inventory committed"
        );
    }
}

fn record_refund(change: &InventoryChange) {
    metrics::record_tickets_refunded(change.moved());
    if change.shortfall() > 0 {
        tracing::warn!(
            event_id = %change.event_id,
            requested = change.requested,
            refunded = change.moved(),
            "Refund capped at event capacity"
        );
    } else {
        tracing::debug!(
            event_id = %change.event_id,
            tickets = change.requested,
            available = change.after,
            "Inventory refunded"
        );
    }
}
