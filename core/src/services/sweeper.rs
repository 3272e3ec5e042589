//! Expiry of abandoned pending bookings.
//!
//! A payer who never returns from the provider leaves a pending booking
//! behind. Once its payment window has passed the sweeper marks it `failed`.
//! Inventory is untouched: a pending booking never took any.

use crate::environment::Clock;
use crate::error::ServiceResult;
use crate::metrics;
use crate::store::BookingRepository;
use std::sync::Arc;
use std::time::Duration;

/// Periodically fails expired pending bookings
#[derive(Clone)]
pub struct PendingBookingSweeper {
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

impl PendingBookingSweeper {
    /// Create a sweeper
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { bookings, clock }
    }

    /// Run one pass; returns how many bookings were expired
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn sweep_once(&self) -> ServiceResult<usize> {
        let expired = self.bookings.expire_pending(self.clock.now()).await?;
        if !expired.is_empty() {
            metrics::record_bookings_expired(expired.len());
            tracing::info!(count = expired.len(), "Expired pending bookings");
            for booking_id in &expired {
                tracing::debug!(%booking_id, "Pending booking expired");
            }
        }
        Ok(expired.len())
    }

    /// Sweep every `interval` until the task is dropped or aborted.
    /// Failed passes are logged and retried on the next tick.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = interval.as_secs(), "Pending booking sweeper started");
        loop {
            ticker.tick().await;
            if let Err(error) = self.sweep_once().await {
                tracing::warn!(%error, "Pending booking sweep failed");
            }
        }
    }
}
