//! Ledger entries as transactions.
//!
//! Lock order is booking row first, event row second, for every entry that
//! touches both. Inventory arithmetic is the core [`Inventory`] type; the
//! database only stores its result.

use crate::{PostgresStore, bookings, database, rows};
use async_trait::async_trait;
use sqlx::PgConnection;
use ticketbooth_core::ledger::{Inventory, InventoryChange};
use ticketbooth_core::store::{InventoryStore, LedgerEntry, LedgerOutcome, LedgerReceipt, StoreResult};
use ticketbooth_core::types::{Booking, Completion, EventId};

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn inventory(&self, event_id: EventId) -> StoreResult<Option<Inventory>> {
        sqlx::query("SELECT total_tickets, available_tickets FROM events WHERE id = $1")
            .bind(*event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::inventory)
            .transpose()
    }

    async fn apply(&self, entry: LedgerEntry) -> StoreResult<LedgerReceipt> {
        let kind = entry_kind(&entry);
        let mut tx = self.pool.begin().await.map_err(database)?;
        let receipt = apply_entry(&mut *tx, entry).await?;
        tx.commit().await.map_err(database)?;

        tracing::debug!(entry = kind, outcome = ?receipt.outcome, "Ledger entry applied");
        metrics::counter!(
            "ticketbooth_ledger_entries_total",
            "entry" => kind,
            "outcome" => outcome_label(receipt.outcome)
        )
        .increment(1);
        Ok(receipt)
    }
}

async fn apply_entry(conn: &mut PgConnection, entry: LedgerEntry) -> StoreResult<LedgerReceipt> {
    match entry {
        LedgerEntry::Commit { event_id, tickets } => {
            Ok(move_inventory(conn, event_id, |inv| inv.commit(event_id, tickets))
                .await?
                .map_or_else(LedgerReceipt::missing, |change| applied(None, Some(change))))
        }
        LedgerEntry::Refund { event_id, tickets } => {
            Ok(move_inventory(conn, event_id, |inv| inv.refund(event_id, tickets))
                .await?
                .map_or_else(LedgerReceipt::missing, |change| applied(None, Some(change))))
        }
        LedgerEntry::ConfirmPayment { booking_id, reference } => {
            let Some(mut booking) = bookings::lock(conn, booking_id).await? else {
                return Ok(LedgerReceipt::missing());
            };
            match booking.complete(reference) {
                Completion::Completed => {
                    let Some(change) = move_inventory(conn, booking.event_id, |inv| {
                        inv.commit(booking.event_id, booking.tickets)
                    })
                    .await?
                    else {
                        return Ok(LedgerReceipt::missing());
                    };
                    bookings::save(conn, &booking).await?;
                    Ok(applied(Some(booking), Some(change)))
                }
                Completion::AlreadyCompleted => Ok(unapplied(LedgerOutcome::Unchanged, booking)),
                Completion::Rejected(_) => Ok(unapplied(LedgerOutcome::Rejected, booking)),
            }
        }
        LedgerEntry::IssueBooking { booking } => {
            let Some(change) = move_inventory(conn, booking.event_id, |inv| {
                inv.commit(booking.event_id, booking.tickets)
            })
            .await?
            else {
                return Ok(LedgerReceipt::missing());
            };
            bookings::insert(conn, &booking).await?;
            Ok(applied(Some(booking), Some(change)))
        }
        LedgerEntry::CancelBooking { booking_id } => {
            let Some(booking) = bookings::delete(conn, booking_id).await? else {
                return Ok(LedgerReceipt::missing());
            };
            let change = if booking.is_completed() {
                move_inventory(conn, booking.event_id, |inv| {
                    inv.refund(booking.event_id, booking.tickets)
                })
                .await?
            } else {
                None
            };
            Ok(applied(Some(booking), change))
        }
    }
}

/// Lock an event's counters, apply `step` and store the result.
/// `None` if the event does not exist.
async fn move_inventory(
    conn: &mut PgConnection,
    event_id: EventId,
    step: impl FnOnce(Inventory) -> (Inventory, InventoryChange) + Send,
) -> StoreResult<Option<InventoryChange>> {
    let Some(row) = sqlx::query("SELECT total_tickets, available_tickets FROM events WHERE id = $1 FOR UPDATE")
        .bind(*event_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(database)?
    else {
        return Ok(None);
    };
    let (after, change) = step(rows::inventory(&row)?);

    sqlx::query("UPDATE events SET available_tickets = $2 WHERE id = $1")
        .bind(*event_id.as_uuid())
        .bind(i64::from(after.available))
        .execute(&mut *conn)
        .await
        .map_err(database)?;
    Ok(Some(change))
}

const fn applied(booking: Option<Booking>, inventory: Option<InventoryChange>) -> LedgerReceipt {
    LedgerReceipt {
        outcome: LedgerOutcome::Applied,
        booking,
        inventory,
    }
}

const fn unapplied(outcome: LedgerOutcome, booking: Booking) -> LedgerReceipt {
    LedgerReceipt {
        outcome,
        booking: Some(booking),
        inventory: None,
    }
}

const fn entry_kind(entry: &LedgerEntry) -> &'static str {
    match entry {
        LedgerEntry::Commit { .. } => "commit",
        LedgerEntry::Refund { .. } => "refund",
        LedgerEntry::ConfirmPayment { .. } => "confirm_payment",
        LedgerEntry::IssueBooking { .. } => "issue_booking",
        LedgerEntry::CancelBooking { .. } => "cancel_booking",
    }
}

const fn outcome_label(outcome: LedgerOutcome) -> &'static str {
    match outcome {
        LedgerOutcome::Applied => "applied",
        LedgerOutcome::Unchanged => "unchanged",
        LedgerOutcome::Rejected => "rejected",
        LedgerOutcome::Missing => "missing",
    }
}
