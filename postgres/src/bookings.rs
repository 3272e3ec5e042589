use crate::{PostgresStore, database, rows};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::collections::HashMap;
use ticketbooth_core::store::{BookingRepository, ReminderMark, StoreResult};
use ticketbooth_core::types::{Booking, BookingDetails, BookingId, ReminderRefusal, UserId};
use uuid::Uuid;

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await.map_err(database)?;
        insert(&mut *conn, booking).await
    }

    async fn find_booking(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        let query = format!("SELECT {} FROM bookings WHERE id = $1", rows::BOOKING_COLUMNS);
        sqlx::query(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::booking)
            .transpose()
    }

    async fn find_booking_details(&self, id: BookingId) -> StoreResult<Option<BookingDetails>> {
        let Some(booking) = self.find_booking(id).await? else {
            return Ok(None);
        };
        Ok(self.booking_details(vec![booking]).await?.pop())
    }

    async fn list_bookings(&self, owner: Option<UserId>) -> StoreResult<Vec<BookingDetails>> {
        let query = format!(
            "SELECT {} FROM bookings WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC",
            rows::BOOKING_COLUMNS
        );
        let bookings = sqlx::query(&query)
            .bind(owner.map(|id| *id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(database)?
            .iter()
            .map(rows::booking)
            .collect::<StoreResult<Vec<_>>>()?;
        self.booking_details(bookings).await
    }

    async fn retick_booking(&self, id: BookingId, tickets: u32) -> StoreResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(database)?;
        let Some(mut booking) = lock(&mut *tx, id).await? else {
            return Ok(None);
        };
        if !booking.retick(tickets) {
            return Ok(None);
        }
        save(&mut *tx, &booking).await?;
        tx.commit().await.map_err(database)?;
        Ok(Some(booking))
    }

    async fn set_payment_reference(&self, id: BookingId, reference: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET payment_reference = $2 WHERE id = $1 AND payment_status = 'pending'",
        )
        .bind(*id.as_uuid())
        .bind(reference)
        .execute(&self.pool)
        .await
        .map_err(database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_reminder_sent(&self, id: BookingId) -> StoreResult<ReminderMark> {
        let mut tx = self.pool.begin().await.map_err(database)?;
        let Some(mut booking) = lock(&mut *tx, id).await? else {
            return Ok(ReminderMark::NotFound);
        };
        match booking.mark_reminder_sent() {
            Ok(()) => {
                save(&mut *tx, &booking).await?;
                tx.commit().await.map_err(database)?;
                Ok(ReminderMark::Marked(booking))
            }
            Err(ReminderRefusal::NotPaid) => Ok(ReminderMark::NotPaid),
            Err(ReminderRefusal::AlreadySent) => Ok(ReminderMark::AlreadySent),
        }
    }

    async fn expire_booking(&self, id: BookingId, now: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET payment_status = 'failed'
            WHERE id = $1 AND payment_status = 'pending'
              AND expires_at IS NOT NULL AND expires_at <= $2
            ",
        )
        .bind(*id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<BookingId>> {
        sqlx::query(
            r"
            UPDATE bookings SET payment_status = 'failed'
            WHERE payment_status = 'pending'
              AND expires_at IS NOT NULL AND expires_at <= $1
            RETURNING id
            ",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(database)?
        .iter()
        .map(|row| rows::uuid(row, "id").map(BookingId::from_uuid))
        .collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(database)?;
        Ok(())
    }
}

impl PostgresStore {
    /// Populate events and bookers for a batch of bookings, preserving order
    async fn booking_details(&self, bookings: Vec<Booking>) -> StoreResult<Vec<BookingDetails>> {
        let mut event_ids: Vec<Uuid> = bookings.iter().map(|b| *b.event_id.as_uuid()).collect();
        event_ids.sort_unstable();
        event_ids.dedup();
        let mut user_ids: Vec<Uuid> = bookings.iter().map(|b| *b.user_id.as_uuid()).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let events: HashMap<_, _> = self
            .events_by_id(event_ids)
            .await?
            .into_iter()
            .map(|event| (event.id, event))
            .collect();
        let users = self.user_summaries(user_ids).await?;

        Ok(bookings
            .into_iter()
            .map(|booking| BookingDetails {
                event: events.get(&booking.event_id).cloned(),
                user: users.get(&booking.user_id).cloned(),
                booking,
            })
            .collect())
    }
}

pub(crate) async fn insert(conn: &mut PgConnection, booking: &Booking) -> StoreResult<()> {
    sqlx::query(
        r"
        INSERT INTO bookings (
            id, user_id, event_id, tickets, unit_price_cents, total_amount_cents,
            payment_status, booking_type, payment_reference, created_at, expires_at, reminder_sent
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ",
    )
    .bind(*booking.id.as_uuid())
    .bind(*booking.user_id.as_uuid())
    .bind(*booking.event_id.as_uuid())
    .bind(i64::from(booking.tickets))
    .bind(rows::cents(booking.unit_price)?)
    .bind(rows::cents(booking.total_amount)?)
    .bind(booking.payment_status.as_str())
    .bind(booking.booking_type.as_str())
    .bind(booking.payment_reference.as_deref())
    .bind(booking.created_at)
    .bind(booking.expires_at)
    .bind(booking.reminder_sent)
    .execute(conn)
    .await
    .map_err(database)?;
    Ok(())
}

/// Load a booking and hold its row lock until the transaction ends
pub(crate) async fn lock(conn: &mut PgConnection, id: BookingId) -> StoreResult<Option<Booking>> {
    let query = format!("SELECT {} FROM bookings WHERE id = $1 FOR UPDATE", rows::BOOKING_COLUMNS);
    sqlx::query(&query)
        .bind(*id.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(database)?
        .as_ref()
        .map(rows::booking)
        .transpose()
}

/// Write back the mutable columns of a booking
pub(crate) async fn save(conn: &mut PgConnection, booking: &Booking) -> StoreResult<()> {
    sqlx::query(
        r"
        UPDATE bookings
        SET tickets = $2, total_amount_cents = $3, payment_status = $4,
            payment_reference = $5, expires_at = $6, reminder_sent = $7
        WHERE id = $1
        ",
    )
    .bind(*booking.id.as_uuid())
    .bind(i64::from(booking.tickets))
    .bind(rows::cents(booking.total_amount)?)
    .bind(booking.payment_status.as_str())
    .bind(booking.payment_reference.as_deref())
    .bind(booking.expires_at)
    .bind(booking.reminder_sent)
    .execute(conn)
    .await
    .map_err(database)?;
    Ok(())
}

pub(crate) async fn delete(conn: &mut PgConnection, id: BookingId) -> StoreResult<Option<Booking>> {
    let query = format!("DELETE FROM bookings WHERE id = $1 RETURNING {}", rows::BOOKING_COLUMNS);
    sqlx::query(&query)
        .bind(*id.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(database)?
        .as_ref()
        .map(rows::booking)
        .transpose()
}
