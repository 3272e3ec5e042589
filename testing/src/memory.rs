//! In-memory implementation of every repository.
//!
//! One mutex guards the whole state, so each call (and each ledger entry in
//! particular) is atomic, matching what the Postgres store achieves with
//! transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use ticketbooth_core::ledger::Inventory;
use ticketbooth_core::store::{
    BookingRepository, EventDeletion, EventRepository, InventoryStore, LedgerEntry, LedgerOutcome,
    LedgerReceipt, ReminderMark, StoreError, StoreResult, UserRepository,
};
use ticketbooth_core::types::{
    Booking, BookingDetails, BookingId, Completion, Event, EventChanges, EventDetails, EventId,
    EventQuery, Page, ReminderRefusal, Role, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    bookings: HashMap<BookingId, Booking>,
}

impl State {
    fn event_details(&self, event: &Event) -> EventDetails {
        EventDetails {
            event: event.clone(),
            creator: self.users.get(&event.created_by).map(User::summary),
        }
    }

    fn booking_details(&self, booking: &Booking) -> BookingDetails {
        BookingDetails {
            booking: booking.clone(),
            event: self.events.get(&booking.event_id).cloned(),
            user: self.users.get(&booking.user_id).map(User::summary),
        }
    }

    fn commit(&mut self, event_id: EventId, tickets: u32) -> Option<ticketbooth_core::ledger::InventoryChange> {
        let event = self.events.get_mut(&event_id)?;
        let (after, change) = event.inventory().commit(event_id, tickets);
        event.available_tickets = after.available;
        Some(change)
    }

    fn refund(&mut self, event_id: EventId, tickets: u32) -> Option<ticketbooth_core::ledger::InventoryChange> {
        let event = self.events.get_mut(&event_id)?;
        let (after, change) = event.inventory().refund(event_id, tickets);
        event.available_tickets = after.available;
        Some(change)
    }

    fn apply(&mut self, entry: LedgerEntry) -> LedgerReceipt {
        match entry {
            LedgerEntry::Commit { event_id, tickets } => match self.commit(event_id, tickets) {
                Some(change) => applied(None, Some(change)),
                None => LedgerReceipt::missing(),
            },
            LedgerEntry::Refund { event_id, tickets } => match self.refund(event_id, tickets) {
                Some(change) => applied(None, Some(change)),
                None => LedgerReceipt::missing(),
            },
            LedgerEntry::ConfirmPayment { booking_id, reference } => {
                let Some(mut booking) = self.bookings.get(&booking_id).cloned() else {
                    return LedgerReceipt::missing();
                };
                if !self.events.contains_key(&booking.event_id) {
                    return LedgerReceipt::missing();
                }
                match booking.complete(reference) {
                    Completion::Completed => {
                        let change = self.commit(booking.event_id, booking.tickets);
                        self.bookings.insert(booking_id, booking.clone());
                        applied(Some(booking), change)
                    }
                    Completion::AlreadyCompleted => LedgerReceipt {
                        outcome: LedgerOutcome::Unchanged,
                        booking: Some(booking),
                        inventory: None,
                    },
                    Completion::Rejected(_) => LedgerReceipt {
                        outcome: LedgerOutcome::Rejected,
                        booking: Some(booking),
                        inventory: None,
                    },
                }
            }
            LedgerEntry::IssueBooking { booking } => {
                let Some(change) = self.commit(booking.event_id, booking.tickets) else {
                    return LedgerReceipt::missing();
                };
                self.bookings.insert(booking.id, booking.clone());
                applied(Some(booking), Some(change))
            }
            LedgerEntry::CancelBooking { booking_id } => {
                let Some(booking) = self.bookings.remove(&booking_id) else {
                    return LedgerReceipt::missing();
                };
                let change = if booking.is_completed() {
                    self.refund(booking.event_id, booking.tickets)
                } else {
                    None
                };
                applied(Some(booking), change)
            }
        }
    }
}

const fn applied(
    booking: Option<Booking>,
    inventory: Option<ticketbooth_core::ledger::InventoryChange>,
) -> LedgerReceipt {
    LedgerReceipt {
        outcome: LedgerOutcome::Applied,
        booking,
        inventory,
    }
}

/// In-memory store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error (or recover)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of an event
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<Event> {
        self.lock().events.get(&id).cloned()
    }

    /// Snapshot of a booking
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.lock().bookings.get(&id).cloned()
    }

    /// Current available count of an event
    #[must_use]
    pub fn available(&self, id: EventId) -> Option<u32> {
        self.lock().events.get(&id).map(|e| e.available_tickets)
    }

    /// Number of stored bookings
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }

    /// Overwrite a booking directly, bypassing every rule (test setup only)
    pub fn put_booking(&self, booking: Booking) {
        self.lock().bookings.insert(booking.id, booking);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unavailable".to_string()));
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.guard()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate {
                entity: "user",
                key: user.email.clone(),
            });
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.guard()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.guard()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.guard()?;
        if let Some(existing) = state.users.get_mut(&user.id) {
            existing.name.clone_from(&user.name);
            existing.role = user.role;
            existing.password_hash.clone_from(&user.password_hash);
        }
        Ok(())
    }

    async fn list_users_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let state = self.guard()?;
        let mut users: Vec<User> = state.users.values().filter(|u| u.role == role).cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.guard()?.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        Ok(self.guard()?.events.get(&id).cloned())
    }

    async fn find_event_details(&self, id: EventId) -> StoreResult<Option<EventDetails>> {
        let state = self.guard()?;
        Ok(state.events.get(&id).map(|event| state.event_details(event)))
    }

    async fn find_event_by_title(&self, title: &str) -> StoreResult<Option<Event>> {
        Ok(self.guard()?.events.values().find(|e| e.title == title).cloned())
    }

    async fn list_events(&self, query: &EventQuery) -> StoreResult<Page<EventDetails>> {
        let state = self.guard()?;
        let mut matching: Vec<&Event> = state.events.values().filter(|e| query.matches(e)).collect();
        matching.sort_by_key(|e| (e.date, e.created_at));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .map(|event| state.event_details(event))
            .collect();
        Ok(Page {
            items,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn update_event(&self, id: EventId, changes: &EventChanges) -> StoreResult<Option<Event>> {
        let mut state = self.guard()?;
        Ok(state.events.get_mut(&id).map(|event| {
            changes.apply_to(event);
            event.clone()
        }))
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<EventDeletion> {
        let mut state = self.guard()?;
        if !state.events.contains_key(&id) {
            return Ok(EventDeletion::NotFound);
        }
        let referencing = state.bookings.values().filter(|b| b.event_id == id).count() as u64;
        if referencing > 0 {
            return Ok(EventDeletion::HasBookings(referencing));
        }
        state.events.remove(&id);
        Ok(EventDeletion::Deleted)
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn inventory(&self, event_id: EventId) -> StoreResult<Option<Inventory>> {
        Ok(self.guard()?.events.get(&event_id).map(Event::inventory))
    }

    async fn apply(&self, entry: LedgerEntry) -> StoreResult<LedgerReceipt> {
        Ok(self.guard()?.apply(entry))
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.guard()?.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        Ok(self.guard()?.bookings.get(&id).cloned())
    }

    async fn find_booking_details(&self, id: BookingId) -> StoreResult<Option<BookingDetails>> {
        let state = self.guard()?;
        Ok(state.bookings.get(&id).map(|booking| state.booking_details(booking)))
    }

    async fn list_bookings(&self, owner: Option<UserId>) -> StoreResult<Vec<BookingDetails>> {
        let state = self.guard()?;
        let mut bookings: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| owner.is_none_or(|owner| b.user_id == owner))
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings.into_iter().map(|b| state.booking_details(b)).collect())
    }

    async fn retick_booking(&self, id: BookingId, tickets: u32) -> StoreResult<Option<Booking>> {
        let mut state = self.guard()?;
        Ok(state
            .bookings
            .get_mut(&id)
            .filter(|booking| booking.is_editable())
            .and_then(|booking| booking.retick(tickets).then(|| booking.clone())))
    }

    async fn set_payment_reference(&self, id: BookingId, reference: &str) -> StoreResult<bool> {
        let mut state = self.guard()?;
        match state.bookings.get_mut(&id) {
            Some(booking) if booking.is_pending() => {
                booking.payment_reference = Some(reference.to_owned());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_reminder_sent(&self, id: BookingId) -> StoreResult<ReminderMark> {
        let mut state = self.guard()?;
        let Some(booking) = state.bookings.get_mut(&id) else {
            return Ok(ReminderMark::NotFound);
        };
        Ok(match booking.mark_reminder_sent() {
            Ok(()) => ReminderMark::Marked(booking.clone()),
            Err(ReminderRefusal::NotPaid) => ReminderMark::NotPaid,
            Err(ReminderRefusal::AlreadySent) => ReminderMark::AlreadySent,
        })
    }

    async fn expire_booking(&self, id: BookingId, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.guard()?;
        Ok(state.bookings.get_mut(&id).is_some_and(|booking| booking.expire(now)))
    }

    async fn expire_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<BookingId>> {
        let mut state = self.guard()?;
        Ok(state
            .bookings
            .values_mut()
            .filter_map(|booking| booking.expire(now).then_some(booking.id))
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.guard().map(|_| ())
    }
}
