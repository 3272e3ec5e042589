//! Booking read, edit and delete tests.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use ticketbooth_core::ServiceError;
use ticketbooth_core::services::{BookingChanges, ComplimentaryRequest};
use ticketbooth_core::types::{BookingType, Money};
use ticketbooth_testing::Harness;

#[tokio::test]
async fn deleting_completed_booking_refunds_tickets() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 3).await;
    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();
    assert_eq!(h.store.available(event.id), Some(2));

    let cancelled = h.services.bookings.delete(&alice, booking.id).await.unwrap();

    assert_eq!(cancelled.refunded, 3);
    assert_eq!(h.store.available(event.id), Some(5));
    assert!(h.store.booking(booking.id).is_none());
}

#[tokio::test]
async fn deleting_pending_booking_leaves_inventory() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 4).await;
    let booking = h.pending_booking(&alice, event.id, 3).await;

    let cancelled = h.services.bookings.delete(&alice, booking.id).await.unwrap();

    assert_eq!(cancelled.refunded, 0);
    assert_eq!(h.store.available(event.id), Some(4));
}

#[tokio::test]
async fn deleting_complimentary_booking_refunds() {
    let h = Harness::new();
    let admin = h.admin().await;
    h.customer("guest@example.com").await;
    let event = h.event(10, 10).await;
    let booking = h
        .services
        .complimentary
        .issue(
            &admin,
            ComplimentaryRequest {
                event_id: event.id,
                user_email: "guest@example.com".into(),
                tickets: 2,
                booking_type: BookingType::Complimentary,
            },
        )
        .await
        .unwrap();

    h.services.bookings.delete(&admin, booking.id).await.unwrap();
    assert_eq!(h.store.available(event.id), Some(10));
}

#[tokio::test]
async fn strangers_cannot_read_or_delete() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let mallory = h.customer("mallory@example.com").await;
    let event = h.event(5, 5).await;
    let booking = h.pending_booking(&alice, event.id, 1).await;

    assert!(matches!(
        h.services.bookings.get(&mallory, booking.id).await,
        Err(ServiceError::Unauthorized(_))
    ));
    assert!(matches!(
        h.services.bookings.delete(&mallory, booking.id).await,
        Err(ServiceError::Unauthorized(_))
    ));
    assert!(h.store.booking(booking.id).is_some());
}

#[tokio::test]
async fn list_is_scoped_to_owner_unless_admin() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let bob = h.customer("bob@example.com").await;
    let admin = h.admin().await;
    let event = h.event(10, 10).await;
    h.pending_booking(&alice, event.id, 1).await;
    h.pending_booking(&bob, event.id, 2).await;

    let mine = h.services.bookings.list(&alice).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].booking.user_id, alice.user_id);
    assert_eq!(mine[0].event.as_ref().map(|e| e.id), Some(event.id));
    assert_eq!(mine[0].user.as_ref().map(|u| u.email.as_str()), Some("alice@example.com"));

    assert_eq!(h.services.bookings.list(&admin).await.unwrap().len(), 2);
}

#[tokio::test]
async fn owner_can_change_tickets_while_pending() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 10).await;
    let booking = h.pending_booking(&alice, event.id, 2).await;

    let updated = h
        .services
        .bookings
        .update(&alice, booking.id, BookingChanges { tickets: Some(4) })
        .await
        .unwrap();

    assert_eq!(updated.booking.tickets, 4);
    assert_eq!(updated.booking.total_amount, Money::from_cents(10_000));
    assert_eq!(h.store.available(event.id), Some(10));
}

#[tokio::test]
async fn tickets_are_frozen_once_an_order_exists() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 10).await;
    let (booking, _) = h.ordered_booking(&alice, event.id, 2).await;

    let err = h
        .services
        .bookings
        .update(&alice, booking.id, BookingChanges { tickets: Some(5) })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(_)));
    assert_eq!(h.store.booking(booking.id).unwrap().tickets, 2);
}

#[tokio::test]
async fn ticket_change_respects_availability() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 3).await;
    let booking = h.pending_booking(&alice, event.id, 2).await;

    let err = h
        .services
        .bookings
        .update(&alice, booking.id, BookingChanges { tickets: Some(4) })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientInventory { available: 3, requested: 4 }));
}
