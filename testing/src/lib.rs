//! # Ticketbooth Testing
//!
//! Test doubles and helpers:
//!
//! - [`FixedClock`]: controllable time
//! - [`InMemoryStore`]: every repository trait, each call atomic
//! - [`ScriptedGateway`]: queued capture answers, recorded orders
//! - [`RecordingNotifier`] / [`FailingNotifier`]
//! - [`Harness`]: all services wired to the doubles
//!
//! ## Example
//!
//! ```no_run
//! use ticketbooth_testing::Harness;
//!
//! # async fn demo() {
//! let h = Harness::new();
//! let alice = h.customer("alice@example.com").await;
//! let event = h.event(5, 5).await;
//! let (booking, order_id) = h.ordered_booking(&alice, event.id, 3).await;
//! h.services.payments.confirm(&alice, booking.id, &order_id).await.ok();
//! assert_eq!(h.store.available(event.id), Some(2));
//! # }
//! ```

pub mod clock;
pub mod fixtures;
pub mod gateway;
pub mod memory;
pub mod notifier;

pub use clock::{FixedClock, test_clock};
pub use fixtures::{Harness, RESERVED_ADMIN_EMAIL, sample_event, sample_user, test_signer};
pub use gateway::ScriptedGateway;
pub use memory::InMemoryStore;
pub use notifier::{FailingNotifier, RecordingNotifier};

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use ticketbooth_core::environment::Clock;
    use ticketbooth_core::store::{InventoryStore, LedgerEntry, LedgerOutcome};

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let h = Harness::new();
        let event = h.event(3, 3).await;
        h.store.set_unavailable(true);
        assert!(h.store.inventory(event.id).await.is_err());
        h.store.set_unavailable(false);
        assert!(h.store.inventory(event.id).await.is_ok());
    }

    #[tokio::test]
    async fn commit_entry_on_missing_event_is_missing() {
        let store = InMemoryStore::new();
        let receipt = store
            .apply(LedgerEntry::Commit {
                event_id: ticketbooth_core::types::EventId::new(),
                tickets: 1,
            })
            .await
            .expect("store is up");
        assert_eq!(receipt.outcome, LedgerOutcome::Missing);
    }
}
