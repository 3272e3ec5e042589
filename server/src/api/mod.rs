//! `/api` handlers and their wire types.
//!
//! Bodies are camelCase JSON. Money travels as a decimal number of currency
//! units (`25.5`), ids as UUID strings, timestamps as RFC 3339.

pub mod auth;
pub mod bookings;
pub mod events;
pub mod health;
pub mod payments;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use ticketbooth_core::FieldError;
use ticketbooth_core::types::{
    Booking, BookingDetails, BookingId, BookingType, Category, Event, EventDetails, EventId, Money, PaymentStatus,
    UserSummary,
};

/// Event as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub time: String,
    pub venue: String,
    pub location: String,
    pub price: f64,
    pub total_tickets: u32,
    pub available_tickets: u32,
    pub image: String,
    /// Creator summary when loaded, otherwise omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl EventView {
    pub fn new(event: Event, creator: Option<UserSummary>) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            category: event.category,
            date: event.date,
            time: event.time,
            venue: event.venue,
            location: event.location,
            price: event.price.as_decimal(),
            total_tickets: event.total_tickets,
            available_tickets: event.available_tickets,
            image: event.image,
            created_by: creator,
            created_at: event.created_at,
        }
    }
}

impl From<EventDetails> for EventView {
    fn from(details: EventDetails) -> Self {
        Self::new(details.event, details.creator)
    }
}

/// Booking as returned by the API.
///
/// `event` and `user` are populated on reads; freshly written bookings carry
/// only their ids.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: BookingId,
    pub event_id: EventId,
    pub user_id: ticketbooth_core::types::UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub tickets: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub booking_type: BookingType,
    pub payment_id: Option<String>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            event_id: booking.event_id,
            user_id: booking.user_id,
            event: None,
            user: None,
            tickets: booking.tickets,
            unit_price: booking.unit_price.as_decimal(),
            total_amount: booking.total_amount.as_decimal(),
            payment_status: booking.payment_status,
            booking_type: booking.booking_type,
            payment_id: booking.payment_reference,
            reminder_sent: booking.reminder_sent,
            created_at: booking.created_at,
            expires_at: booking.expires_at,
        }
    }
}

impl From<BookingDetails> for BookingView {
    fn from(details: BookingDetails) -> Self {
        let mut view = Self::from(details.booking);
        view.event = details.event.map(|event| EventView::new(event, None));
        view.user = details.user;
        view
    }
}

/// `{ success: true, data }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub const fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// `{ success: true, message }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub const fn new(message: &'static str) -> Self {
        Self { success: true, message }
    }
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>, FieldError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| FieldError::new(field, "Please provide a valid date"))
}

pub(crate) fn parse_price(field: &str, amount: f64) -> Result<Money, FieldError> {
    Money::from_decimal(amount).ok_or_else(|| FieldError::new(field, "Price must be a positive number"))
}
