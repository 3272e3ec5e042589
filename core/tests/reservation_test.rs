//! Reservation service tests.
//!
//! Creating a regular booking checks availability but never moves inventory.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use ticketbooth_core::ServiceError;
use ticketbooth_core::types::{BookingType, EventId, Money, PaymentStatus};
use ticketbooth_testing::{FailingNotifier, Harness};

#[tokio::test]
async fn booking_is_pending_and_leaves_inventory_alone() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;

    let booking = h
        .services
        .reservations
        .create_booking(&alice, event.id, 3)
        .await
        .unwrap();

    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.booking_type, BookingType::Regular);
    assert_eq!(booking.total_amount, Money::from_cents(7_500));
    assert_eq!(booking.user_id, alice.user_id);
    assert!(!booking.reminder_sent);
    assert_eq!(h.store.available(event.id), Some(5));
}

#[tokio::test]
async fn sold_out_event_reports_zero_available() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 0).await;

    let err = h
        .services
        .reservations
        .create_booking(&alice, event.id, 1)
        .await
        .unwrap_err();

    match err {
        ServiceError::InsufficientInventory { available, requested } => {
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }
    assert_eq!(h.store.booking_count(), 0);
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;

    let err = h
        .services
        .reservations
        .create_booking(&alice, EventId::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { resource: "Event", .. }));
}

#[tokio::test]
async fn zero_tickets_is_rejected_before_any_lookup() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;

    let err = h
        .services
        .reservations
        .create_booking(&alice, EventId::new(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(_)));
}

#[tokio::test]
async fn pending_bookings_may_jointly_exceed_inventory() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let bob = h.customer("bob@example.com").await;
    let event = h.event(2, 2).await;

    h.pending_booking(&alice, event.id, 2).await;
    h.pending_booking(&bob, event.id, 2).await;

    assert_eq!(h.store.booking_count(), 2);
    assert_eq!(h.store.available(event.id), Some(2));
}

#[tokio::test]
async fn sends_payment_pending_notification() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;

    h.pending_booking(&alice, event.id, 1).await;

    let sent = h.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@example.com");
    assert!(sent[0].subject.contains(&event.title));
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_booking() {
    let notifier = Arc::new(FailingNotifier::new());
    let h = Harness::with_notifier(notifier.clone());
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;

    let booking = h.services.reservations.create_booking(&alice, event.id, 2).await;

    assert!(booking.is_ok());
    for _ in 0..100 {
        if notifier.attempts() > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(notifier.attempts(), 1);
}

#[tokio::test]
async fn price_change_does_not_reprice_existing_booking() {
    let h = Harness::new();
    let admin = h.admin().await;
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let booking = h.pending_booking(&alice, event.id, 2).await;

    h.services
        .events
        .update(
            &admin,
            event.id,
            ticketbooth_core::types::EventChanges {
                price: Some(Money::from_cents(9_900)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = h.store.booking(booking.id).unwrap();
    assert_eq!(stored.total_amount, Money::from_cents(5_000));
    assert_eq!(stored.unit_price, Money::from_cents(2_500));
}
