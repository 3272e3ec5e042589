//! Pending booking expiry tests.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use ticketbooth_core::types::PaymentStatus;
use ticketbooth_testing::Harness;

#[tokio::test]
async fn sweep_fails_only_expired_pending_bookings() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 10).await;

    let stale = h.pending_booking(&alice, event.id, 1).await;
    let (paid, order_id) = h.ordered_booking(&alice, event.id, 2).await;
    h.services.payments.confirm(&alice, paid.id, &order_id).await.unwrap();

    h.clock.advance(Duration::minutes(20));
    let fresh = h.pending_booking(&alice, event.id, 1).await;
    h.clock.advance(Duration::minutes(15));

    assert_eq!(h.services.sweeper.sweep_once().await.unwrap(), 1);

    assert_eq!(h.store.booking(stale.id).unwrap().payment_status, PaymentStatus::Failed);
    assert_eq!(h.store.booking(fresh.id).unwrap().payment_status, PaymentStatus::Pending);
    assert_eq!(h.store.booking(paid.id).unwrap().payment_status, PaymentStatus::Completed);
    assert_eq!(h.store.available(event.id), Some(8));

    assert_eq!(h.services.sweeper.sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn store_outage_surfaces_from_a_single_pass() {
    let h = Harness::new();
    h.store.set_unavailable(true);
    assert!(h.services.sweeper.sweep_once().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn run_loop_sweeps_on_each_tick() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 10).await;
    let booking = h.pending_booking(&alice, event.id, 1).await;
    h.clock.advance(Duration::hours(1));

    let task = tokio::spawn(h.services.sweeper.clone().run(std::time::Duration::from_secs(60)));
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    task.abort();

    assert_eq!(h.store.booking(booking.id).unwrap().payment_status, PaymentStatus::Failed);
}
