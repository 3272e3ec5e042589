//! Row mapping between tables and domain types.

use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};
use std::str::FromStr;
use ticketbooth_core::store::{StoreError, StoreResult};
use ticketbooth_core::types::{Booking, BookingId, Event, EventId, Money, User, UserId};
use uuid::Uuid;

pub const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

pub const EVENT_COLUMNS: &str = "id, title, description, category, date, time, venue, location, \
     price_cents, total_tickets, available_tickets, image, created_by, created_at";

pub const BOOKING_COLUMNS: &str = "id, user_id, event_id, tickets, unit_price_cents, \
     total_amount_cents, payment_status, booking_type, payment_reference, created_at, \
     expires_at, reminder_sent";

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn parsed<T>(row: &PgRow, name: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text: String = column(row, name)?;
    text.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn count(row: &PgRow, name: &str) -> StoreResult<u32> {
    let value: i64 = column(row, name)?;
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("column {name}: {value} out of range")))
}

fn money(row: &PgRow, name: &str) -> StoreResult<Money> {
    let value: i64 = column(row, name)?;
    u64::try_from(value)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Corrupt(format!("column {name}: negative amount {value}")))
}

/// Cents as stored
pub fn cents(amount: Money) -> StoreResult<i64> {
    i64::try_from(amount.cents()).map_err(|_| StoreError::Database(format!("amount {amount} too large")))
}

pub fn user(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::from_uuid(column(row, "id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        role: parsed(row, "role")?,
        created_at: column(row, "created_at")?,
    })
}

pub fn event(row: &PgRow) -> StoreResult<Event> {
    Ok(Event {
        id: EventId::from_uuid(column(row, "id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        category: parsed(row, "category")?,
        date: column(row, "date")?,
        time: column(row, "time")?,
        venue: column(row, "venue")?,
        location: column(row, "location")?,
        price: money(row, "price_cents")?,
        total_tickets: count(row, "total_tickets")?,
        available_tickets: count(row, "available_tickets")?,
        image: column(row, "image")?,
        created_by: UserId::from_uuid(column(row, "created_by")?),
        created_at: column(row, "created_at")?,
    })
}

pub fn booking(row: &PgRow) -> StoreResult<Booking> {
    Ok(Booking {
        id: BookingId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        event_id: EventId::from_uuid(column(row, "event_id")?),
        tickets: count(row, "tickets")?,
        unit_price: money(row, "unit_price_cents")?,
        total_amount: money(row, "total_amount_cents")?,
        payment_status: parsed(row, "payment_status")?,
        booking_type: parsed(row, "booking_type")?,
        payment_reference: column(row, "payment_reference")?,
        created_at: column(row, "created_at")?,
        expires_at: column(row, "expires_at")?,
        reminder_sent: column(row, "reminder_sent")?,
    })
}

pub fn inventory(row: &PgRow) -> StoreResult<ticketbooth_core::ledger::Inventory> {
    Ok(ticketbooth_core::ledger::Inventory::new(
        count(row, "total_tickets")?,
        count(row, "available_tickets")?,
    ))
}

pub fn uuid(row: &PgRow, name: &str) -> StoreResult<Uuid> {
    column(row, name)
}

pub fn total(row: &PgRow) -> StoreResult<u64> {
    let value: i64 = column(row, "total")?;
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative count {value}")))
}
