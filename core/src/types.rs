//! Domain types for Ticketbooth.
//!
//! Identifiers, money, the event catalogue entry, bookings and users. Bookings
//! carry their own lifecycle rules (`pending → completed`, expiry to `failed`,
//! the one-shot reminder flag) so every store applies them the same way.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Largest amount that can be stored (a signed 64-bit count of cents)
    #[allow(clippy::cast_sign_loss)]
    pub const MAX: Self = Self(i64::MAX as u64);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from a decimal amount such as `49.99`.
    ///
    /// Rounds to the nearest cent. Returns `None` for negative, non-finite
    /// or out-of-range amounts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents >= Self::MAX.0 as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount as a decimal number of currency units
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies money by a quantity, `None` past [`Money::MAX`]
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) if result <= Self::MAX.0 => Some(Self(result)),
            _ => None,
        }
    }

    /// Two-decimal rendering without currency symbol (`"150.00"`), the form
    /// payment providers expect.
    #[must_use]
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal_string())
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Error returned when parsing one of the string-backed enums fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Lower-case wire/storage name
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

/// Account role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer
    User,
    /// Administrator: manages events, issues complimentary bookings
    Admin,
}

string_enum!(Role, "role", { User => "user", Admin => "admin" });

/// Event category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Live music
    Concert,
    /// Talks and summits
    Conference,
    /// Hands-on sessions
    Workshop,
    /// Sporting fixtures
    Sports,
    /// Stage productions
    Theater,
    /// Anything else
    Other,
}

string_enum!(Category, "category", {
    Concert => "concert",
    Conference => "conference",
    Workshop => "workshop",
    Sports => "sports",
    Theater => "theater",
    Other => "other",
});

/// Payment status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment confirmation
    Pending,
    /// Paid (or issued without payment)
    Completed,
    /// Abandoned or expired before payment
    Failed,
    /// Paid and then refunded out of band
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

/// How a booking came to exist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    /// Paid through the payment gateway
    Regular,
    /// Issued free of charge by an administrator
    Complimentary,
    /// Issued by an administrator to a VIP guest
    Vip,
}

string_enum!(BookingType, "booking type", {
    Regular => "regular",
    Complimentary => "complimentary",
    Vip => "vip",
});

impl BookingType {
    /// Whether this type may be issued by an administrator without payment
    #[must_use]
    pub const fn is_issued(&self) -> bool {
        matches!(self, Self::Complimentary | Self::Vip)
    }
}

// ============================================================================
// Users
// ============================================================================

/// A registered account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Identity
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Lower-cased, unique e-mail address
    pub email: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    /// Role
    pub role: Role,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public projection of this user
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// The public face of a user: `{id, name, email, role}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Identity
    pub id: UserId,
    /// Display name
    pub name: String,
    /// E-mail address
    pub email: String,
    /// Role
    pub role: Role,
}

/// The authenticated principal behind a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Who is acting
    pub user_id: UserId,
    /// With which role
    pub role: Role,
}

impl Actor {
    /// Build an actor
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the actor is an administrator
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Owner-or-admin check used by every booking read and write
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}

// ============================================================================
// Events
// ============================================================================

/// Image used when an event is created without one
pub const DEFAULT_EVENT_IMAGE: &str = "https://via.placeholder.com/400x300";

/// An event in the catalogue; the record that carries ticket inventory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Identity
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Category
    pub category: Category,
    /// Day of the event
    pub date: DateTime<Utc>,
    /// Start time as displayed, e.g. `"19:00"`
    pub time: String,
    /// Venue name
    pub venue: String,
    /// City / address
    pub location: String,
    /// Price per ticket
    pub price: Money,
    /// Capacity, fixed at creation
    pub total_tickets: u32,
    /// Tickets still for sale; changed only through the inventory ledger
    pub available_tickets: u32,
    /// Image URL
    pub image: String,
    /// Administrator who created the event
    pub created_by: UserId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Inventory counters of this event
    #[must_use]
    pub const fn inventory(&self) -> crate::ledger::Inventory {
        crate::ledger::Inventory::new(self.total_tickets, self.available_tickets)
    }
}

/// An event together with its creator's summary, as returned by reads
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDetails {
    /// The event
    pub event: Event,
    /// Creator, if the account still exists
    pub creator: Option<UserSummary>,
}

/// Whitelisted administrator edits to an event.
///
/// Inventory counters and ownership are deliberately absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventChanges {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category: Option<Category>,
    /// New date
    pub date: Option<DateTime<Utc>>,
    /// New start time
    pub time: Option<String>,
    /// New venue
    pub venue: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New ticket price (existing bookings keep their own)
    pub price: Option<Money>,
    /// New image URL
    pub image: Option<String>,
}

impl EventChanges {
    /// Apply these changes to an event in place
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(time) = &self.time {
            event.time.clone_from(time);
        }
        if let Some(venue) = &self.venue {
            event.venue.clone_from(venue);
        }
        if let Some(location) = &self.location {
            event.location.clone_from(location);
        }
        if let Some(price) = self.price {
            event.price = price;
        }
        if let Some(image) = &self.image {
            event.image.clone_from(image);
        }
    }

    /// Whether nothing would change
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.venue.is_none()
            && self.location.is_none()
            && self.price.is_none()
            && self.image.is_none()
    }
}

/// Catalogue listing query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventQuery {
    /// Restrict to one category
    pub category: Option<Category>,
    /// Case-insensitive substring over title, description and venue
    pub search: Option<String>,
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl EventQuery {
    /// Default page size
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Largest accepted page size
    pub const MAX_LIMIT: u32 = 100;

    /// Build a query, normalising page/limit into their accepted ranges
    #[must_use]
    pub fn new(category: Option<Category>, search: Option<String>, page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            category,
            search: search.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()),
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Whether an event satisfies the category and search filters
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.category.is_some_and(|c| c != event.category) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&event.title, &event.description, &event.venue]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

impl Default for EventQuery {
    fn default() -> Self {
        Self::new(None, None, None, None)
    }
}

/// One page of results
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total matching items across all pages
    pub total: u64,
    /// This page's number (1-based)
    pub page: u32,
    /// Page size used
    pub limit: u32,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` items
    #[must_use]
    pub const fn pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit as u64)
        }
    }

    /// Transform the items, keeping pagination
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// A user's claim on N tickets of an event, with its payment lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Booking {
    /// Identity
    pub id: BookingId,
    /// Booker
    pub user_id: UserId,
    /// Event
    pub event_id: EventId,
    /// Ticket count, at least 1
    pub tickets: u32,
    /// Ticket price captured when the booking was made
    pub unit_price: Money,
    /// `unit_price × tickets`
    pub total_amount: Money,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Regular, complimentary or VIP
    pub booking_type: BookingType,
    /// Gateway order id, once one exists
    pub payment_reference: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Deadline for paying a pending booking
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the event reminder went out
    pub reminder_sent: bool,
}

/// Result of asking a booking to become `completed`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The booking moved to `completed` just now
    Completed,
    /// It was already `completed`; nothing changed
    AlreadyCompleted,
    /// It is `refunded`; cannot be completed
    Rejected(PaymentStatus),
}

/// Why a reminder may not be sent for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReminderRefusal {
    /// Booking is not `completed`
    NotPaid,
    /// Reminder flag is already set
    AlreadySent,
}

impl Booking {
    /// A fresh pending regular booking priced at `unit_price`.
    ///
    /// Returns `None` if the total would overflow.
    #[must_use]
    pub fn pending(
        user_id: UserId,
        event_id: EventId,
        tickets: u32,
        unit_price: Money,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<Self> {
        let total_amount = unit_price.checked_multiply(tickets)?;
        Some(Self {
            id: BookingId::new(),
            user_id,
            event_id,
            tickets,
            unit_price,
            total_amount,
            payment_status: PaymentStatus::Pending,
            booking_type: BookingType::Regular,
            payment_reference: None,
            created_at: now,
            expires_at: now.checked_add_signed(ttl),
            reminder_sent: false,
        })
    }

    /// An administrator-issued booking, already `completed`.
    ///
    /// Issued bookings record the event's ticket price but are never charged.
    #[must_use]
    pub fn issued(
        user_id: UserId,
        event_id: EventId,
        tickets: u32,
        unit_price: Money,
        booking_type: BookingType,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let total_amount = unit_price.checked_multiply(tickets)?;
        Some(Self {
            id: BookingId::new(),
            user_id,
            event_id,
            tickets,
            unit_price,
            total_amount,
            payment_status: PaymentStatus::Completed,
            booking_type,
            payment_reference: None,
            created_at: now,
            expires_at: None,
            reminder_sent: false,
        })
    }

    /// Whether the booking is still awaiting payment
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Pending)
    }

    /// Whether the booking is paid
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Completed)
    }

    /// A pending booking whose payment window has passed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Whether the ticket count may still be edited by its owner
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        self.is_pending() && self.payment_reference.is_none()
    }

    /// Move to `completed` after a verified capture.
    ///
    /// A `failed` booking is accepted too: it only means the payment window
    /// lapsed while the customer was still paying, and the money has moved.
    pub fn complete(&mut self, reference: String) -> Completion {
        match self.payment_status {
            PaymentStatus::Completed => Completion::AlreadyCompleted,
            PaymentStatus::Refunded => Completion::Rejected(PaymentStatus::Refunded),
            PaymentStatus::Pending | PaymentStatus::Failed => {
                self.payment_status = PaymentStatus::Completed;
                self.payment_reference = Some(reference);
                self.expires_at = None;
                Completion::Completed
            }
        }
    }

    /// Mark an expired pending booking `failed`. Returns whether it changed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            self.payment_status = PaymentStatus::Failed;
            true
        } else {
            false
        }
    }

    /// Flip the reminder flag, at most once, on a paid booking
    ///
    /// # Errors
    ///
    /// [`ReminderRefusal`] when the booking is unpaid or already reminded.
    pub fn mark_reminder_sent(&mut self) -> Result<(), ReminderRefusal> {
        if !self.is_completed() {
            return Err(ReminderRefusal::NotPaid);
        }
        if self.reminder_sent {
            return Err(ReminderRefusal::AlreadySent);
        }
        self.reminder_sent = true;
        Ok(())
    }

    /// Change the ticket count of an editable booking, repricing from the
    /// captured unit price. Returns `false` if not editable or on overflow.
    pub fn retick(&mut self, tickets: u32) -> bool {
        if !self.is_editable() {
            return false;
        }
        match self.unit_price.checked_multiply(tickets) {
            Some(total) => {
                self.tickets = tickets;
                self.total_amount = total;
                true
            }
            None => false,
        }
    }
}

/// A booking with its event and booker populated, as returned by reads
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDetails {
    /// The booking
    pub booking: Booking,
    /// Event, if it still exists
    pub event: Option<Event>,
    /// Booker, if the account still exists
    pub user: Option<UserSummary>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn pending_booking() -> Booking {
        Booking::pending(
            UserId::new(),
            EventId::new(),
            3,
            Money::from_cents(2_500),
            now(),
            Duration::minutes(30),
        )
        .expect("total fits")
    }

    #[test]
    fn money_decimal_conversions() {
        assert_eq!(Money::from_decimal(49.99), Some(Money::from_cents(4_999)));
        assert_eq!(Money::from_decimal(0.0), Some(Money::ZERO));
        assert_eq!(Money::from_decimal(-1.0), None);
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_decimal(1e17), None);
        assert_eq!(Money::from_decimal(9e15), Some(Money::from_cents(900_000_000_000_000_000)));
        assert_eq!(Money::from_cents(15_000).to_decimal_string(), "150.00");
        assert_eq!(Money::from_cents(705).to_string(), "$7.05");
        assert!((Money::from_cents(1_999).as_decimal() - 19.99).abs() < f64::EPSILON);
    }

    #[test]
    fn multiplication_stops_at_storable_amounts() {
        assert_eq!(Money::from_cents(2_500).checked_multiply(3), Some(Money::from_cents(7_500)));
        assert_eq!(Money::MAX.checked_multiply(1), Some(Money::MAX));
        assert_eq!(Money::MAX.checked_multiply(2), None);
        assert_eq!(Money::from_cents(u64::MAX / 2).checked_multiply(2), None);
    }

    #[test]
    fn pending_booking_prices_and_expires() {
        let booking = pending_booking();
        assert_eq!(booking.total_amount, Money::from_cents(7_500));
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(booking.booking_type, BookingType::Regular);
        assert_eq!(booking.expires_at, Some(now() + Duration::minutes(30)));
        assert!(!booking.is_expired(now()));
        assert!(booking.is_expired(now() + Duration::minutes(30)));
    }

    #[test]
    fn complete_is_idempotent() {
        let mut booking = pending_booking();
        assert_eq!(booking.complete("ORDER-1".into()), Completion::Completed);
        assert_eq!(booking.complete("ORDER-2".into()), Completion::AlreadyCompleted);
        assert_eq!(booking.payment_reference.as_deref(), Some("ORDER-1"));
        assert_eq!(booking.expires_at, None);
    }

    #[test]
    fn refunded_booking_cannot_complete() {
        let mut booking = pending_booking();
        booking.payment_status = PaymentStatus::Refunded;
        assert_eq!(
            booking.complete("ORDER-1".into()),
            Completion::Rejected(PaymentStatus::Refunded)
        );
    }

    #[test]
    fn expiry_only_touches_pending() {
        let mut booking = pending_booking();
        let later = now() + Duration::hours(1);
        assert!(booking.expire(later));
        assert_eq!(booking.payment_status, PaymentStatus::Failed);
        assert!(!booking.expire(later));

        let mut paid = pending_booking();
        paid.complete("ORDER-1".into());
        assert!(!paid.expire(later));
        assert!(paid.is_completed());
    }

    #[test]
    fn reminder_flag_is_set_once() {
        let mut booking = pending_booking();
        assert_eq!(booking.mark_reminder_sent(), Err(ReminderRefusal::NotPaid));
        booking.complete("ORDER-1".into());
        assert_eq!(booking.mark_reminder_sent(), Ok(()));
        assert_eq!(booking.mark_reminder_sent(), Err(ReminderRefusal::AlreadySent));
    }

    #[test]
    fn retick_uses_captured_price() {
        let mut booking = pending_booking();
        assert!(booking.retick(4));
        assert_eq!(booking.total_amount, Money::from_cents(10_000));

        booking.payment_reference = Some("ORDER-1".into());
        assert!(!booking.retick(1));
        assert_eq!(booking.tickets, 4);
    }

    #[test]
    fn query_normalises_paging() {
        let query = EventQuery::new(None, Some("  ".into()), Some(0), Some(1_000));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, EventQuery::MAX_LIMIT);
        assert_eq!(query.search, None);
        assert_eq!(EventQuery::new(None, None, Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn page_count_rounds_up() {
        let page: Page<()> = Page { items: vec![], total: 21, page: 1, limit: 10 };
        assert_eq!(page.pages(), 3);
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().ok(), Some(*status));
        }
        assert!("vip".parse::<BookingType>().is_ok_and(|t| t.is_issued()));
        assert!("bogus".parse::<Category>().is_err());
    }
}
