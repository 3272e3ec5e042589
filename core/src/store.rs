//! Persistence contracts.
//!
//! The stores are dumb: they hold records and apply the atomic ledger entries
//! they are handed, but never decide who may do what. Authorization and
//! validation live in [`crate::services`].
//!
//! Every write that touches `available_tickets` goes through
//! [`InventoryStore::apply`], which executes one [`LedgerEntry`] as a single
//! atomic unit. That is the only path by which inventory changes.

use crate::ledger::{Inventory, InventoryChange};
use crate::types::{
    Booking, BookingDetails, BookingId, Event, EventChanges, EventDetails, EventId, EventQuery,
    Page, Role, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend failed (connection, query, transaction)
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate {entity}: {key}")]
    Duplicate {
        /// Kind of record
        entity: &'static str,
        /// Offending key
        key: String,
    },

    /// A stored row could not be mapped back into a domain value
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Ledger entries
// ============================================================================

/// One atomic inventory-affecting write.
///
/// Each variant is executed by the store as a single transaction: the booking
/// change and the inventory change either both happen or neither does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Decrement available tickets, flooring at zero
    Commit {
        /// Event whose inventory moves
        event_id: EventId,
        /// Tickets to take
        tickets: u32,
    },
    /// Increment available tickets, capped at the event's capacity
    Refund {
        /// Event whose inventory moves
        event_id: EventId,
        /// Tickets to return
        tickets: u32,
    },
    /// Flip a booking to `completed` and commit its tickets, once.
    ///
    /// If the booking is already `completed` nothing is written.
    ConfirmPayment {
        /// Booking being paid
        booking_id: BookingId,
        /// Gateway order id to record
        reference: String,
    },
    /// Insert an already-completed booking and commit its tickets
    IssueBooking {
        /// The booking to insert (status `completed`)
        booking: Booking,
    },
    /// Delete a booking, refunding its tickets if it was `completed`
    CancelBooking {
        /// Booking to delete
        booking_id: BookingId,
    },
}

/// What happened when a [`LedgerEntry`] was applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// The entry was applied
    Applied,
    /// The entry was a no-op because its effect already happened
    /// (a confirm on an already-completed booking)
    Unchanged,
    /// The booking is in a status the entry may not act on
    Rejected,
    /// The booking or event does not exist
    Missing,
}

/// Receipt returned by [`InventoryStore::apply`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Outcome of the entry
    pub outcome: LedgerOutcome,
    /// Booking after the entry (before deletion, for `CancelBooking`)
    pub booking: Option<Booking>,
    /// Inventory movement, when one happened
    pub inventory: Option<InventoryChange>,
}

impl LedgerReceipt {
    /// Receipt for an entry whose target does not exist
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            outcome: LedgerOutcome::Missing,
            booking: None,
            inventory: None,
        }
    }

    /// Whether the entry was applied
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self.outcome, LedgerOutcome::Applied)
    }
}

/// Outcome of deleting an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventDeletion {
    /// Removed
    Deleted,
    /// No such event
    NotFound,
    /// Refused: bookings still reference it
    HasBookings(u64),
}

/// Outcome of the conditional reminder-flag update
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReminderMark {
    /// The flag went from false to true; the caller owns the send
    Marked(Booking),
    /// Flag already set
    AlreadySent,
    /// Booking not `completed`
    NotPaid,
    /// No such booking
    NotFound,
}

// ============================================================================
// Repositories
// ============================================================================

/// Account storage
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] if the e-mail is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Look up by id
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Look up by (lower-cased) e-mail
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Overwrite name, role and password hash of an existing user
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    /// Every user holding `role`
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
}

/// Event catalogue storage.
///
/// There is no way to write inventory counters here.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;

    /// Look up by id
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>>;

    /// Look up by id with the creator populated
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_event_details(&self, id: EventId) -> StoreResult<Option<EventDetails>>;

    /// Look up by exact title
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_event_by_title(&self, title: &str) -> StoreResult<Option<Event>>;

    /// Filtered, date-ascending, paginated listing with creators populated
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn list_events(&self, query: &EventQuery) -> StoreResult<Page<EventDetails>>;

    /// Apply whitelisted changes; `None` if the event does not exist
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn update_event(&self, id: EventId, changes: &EventChanges) -> StoreResult<Option<Event>>;

    /// Delete an event unless bookings reference it
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn delete_event(&self, id: EventId) -> StoreResult<EventDeletion>;
}

/// Inventory counters and the atomic ledger entries that move them
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Current counters of an event
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn inventory(&self, event_id: EventId) -> StoreResult<Option<Inventory>>;

    /// Execute one ledger entry atomically
    ///
    /// # Errors
    ///
    /// Backend failures. A missing target is reported as
    /// [`LedgerOutcome::Missing`], not as an error.
    async fn apply(&self, entry: LedgerEntry) -> StoreResult<LedgerReceipt>;
}

/// Booking storage.
///
/// Status changes that move inventory are ledger entries; the methods here
/// only cover writes that never touch inventory.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a pending booking
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Look up by id
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_booking(&self, id: BookingId) -> StoreResult<Option<Booking>>;

    /// Look up by id with event and booker populated
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn find_booking_details(&self, id: BookingId) -> StoreResult<Option<BookingDetails>>;

    /// Bookings of one user, or of everyone when `owner` is `None`; newest first
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn list_bookings(&self, owner: Option<UserId>) -> StoreResult<Vec<BookingDetails>>;

    /// Change the ticket count of a booking that is still editable
    /// (pending, no gateway order). `None` if missing or no longer editable.
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn retick_booking(&self, id: BookingId, tickets: u32) -> StoreResult<Option<Booking>>;

    /// Record the gateway order id on a pending booking
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn set_payment_reference(&self, id: BookingId, reference: &str) -> StoreResult<bool>;

    /// Set the reminder flag if and only if the booking is `completed` and
    /// the flag is still false
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn mark_reminder_sent(&self, id: BookingId) -> StoreResult<ReminderMark>;

    /// Mark one pending booking `failed` if its deadline has passed
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn expire_booking(&self, id: BookingId, now: DateTime<Utc>) -> StoreResult<bool>;

    /// Mark every pending booking whose deadline has passed `failed`
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn expire_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<BookingId>>;

    /// Cheap liveness probe
    ///
    /// # Errors
    ///
    /// The backend is unreachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Marker for a backend that implements every repository
pub trait Store: UserRepository + EventRepository + InventoryStore + BookingRepository {}

impl<T> Store for T where T: UserRepository + EventRepository + InventoryStore + BookingRepository {}
