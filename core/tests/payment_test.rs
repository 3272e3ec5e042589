//! Payment reconciliation tests.
//!
//! Covers order creation, confirmation (capture + exactly-once commit),
//! expiry, oversell handling and reminders.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::Duration;
use ticketbooth_core::ServiceError;
use ticketbooth_core::gateway::{CaptureStatus, GatewayError};
use ticketbooth_core::services::ConfirmOutcome;
use ticketbooth_core::store::EventRepository;
use ticketbooth_core::types::{Booking, BookingId, BookingType, EventId, Money, PaymentStatus, Role};
use ticketbooth_testing::{Harness, sample_event};

/// Inventory 5, book 3, confirm → 2; confirming again leaves it at 2.
#[tokio::test]
async fn confirm_commits_once() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 3).await;
    assert_eq!(h.store.available(event.id), Some(5));

    let first = h
        .services
        .payments
        .confirm(&alice, booking.id, &order_id)
        .await
        .unwrap();
    assert_eq!(first.booking.payment_status, PaymentStatus::Completed);
    assert_eq!(first.booking.payment_reference.as_deref(), Some(order_id.as_str()));
    assert!(matches!(first.outcome, ConfirmOutcome::Confirmed { .. }));
    assert_eq!(first.oversold(), 0);
    assert_eq!(h.store.available(event.id), Some(2));

    let second = h
        .services
        .payments
        .confirm(&alice, booking.id, &order_id)
        .await
        .unwrap();
    assert_eq!(second.outcome, ConfirmOutcome::AlreadyConfirmed);
    assert_eq!(h.store.available(event.id), Some(2));
    assert_eq!(h.gateway.capture_calls(), 1, "second confirm must not capture again");
}

#[tokio::test]
async fn create_order_charges_exact_total() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(10, 10).await;
    let booking = h.pending_booking(&alice, event.id, 4).await;

    let created = h.services.payments.create_order(&alice, booking.id).await.unwrap();

    let orders = h.gateway.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].amount, Money::from_cents(10_000));
    assert_eq!(orders[0].booking_id, booking.id);
    assert_eq!(orders[0].event_id, event.id);
    assert!(created.order.approval_url.contains(&created.order.order_id));
    assert_eq!(
        h.store.booking(booking.id).unwrap().payment_reference,
        Some(created.order.order_id)
    );
}

#[tokio::test]
async fn create_order_is_owner_only() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let admin = h.admin().await;
    let event = h.event(5, 5).await;
    let booking = h.pending_booking(&alice, event.id, 1).await;

    let err = h.services.payments.create_order(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn create_order_on_paid_booking_is_already_paid() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;
    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();

    let err = h.services.payments.create_order(&alice, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyPaid));
}

#[tokio::test]
async fn create_order_rechecks_inventory() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let bob = h.customer("bob@example.com").await;
    let event = h.event(3, 3).await;
    let alice_booking = h.pending_booking(&alice, event.id, 2).await;
    let (bob_booking, bob_order) = h.ordered_booking(&bob, event.id, 2).await;
    h.services.payments.confirm(&bob, bob_booking.id, &bob_order).await.unwrap();

    let err = h
        .services
        .payments
        .create_order(&alice, alice_booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientInventory { available: 1, requested: 2 }));
    assert_eq!(h.gateway.orders().len(), 1);
}

#[tokio::test]
async fn gateway_failure_on_create_order_is_a_gateway_error() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let booking = h.pending_booking(&alice, event.id, 1).await;
    h.gateway
        .fail_orders(Some(GatewayError::Transport("connection reset".into())));

    let err = h.services.payments.create_order(&alice, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Gateway(_)));
    assert!(err.is_internal());
    assert_eq!(h.store.booking(booking.id).unwrap().payment_reference, None);
}

#[tokio::test]
async fn unsuccessful_capture_leaves_booking_pending() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 2).await;
    h.gateway.push_capture(Ok(CaptureStatus::from_provider("PAYER_ACTION_REQUIRED")));

    let err = h
        .services
        .payments
        .confirm(&alice, booking.id, &order_id)
        .await
        .unwrap_err();
    match err {
        ServiceError::PaymentNotCompleted { status } => assert_eq!(status, "PAYER_ACTION_REQUIRED"),
        other => panic!("expected PaymentNotCompleted, got {other:?}"),
    }
    assert_eq!(h.store.booking(booking.id).unwrap().payment_status, PaymentStatus::Pending);
    assert_eq!(h.store.available(event.id), Some(5));

    // the caller may retry
    let retried = h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();
    assert_eq!(retried.booking.payment_status, PaymentStatus::Completed);
    assert_eq!(h.store.available(event.id), Some(3));
}

#[tokio::test]
async fn capture_transport_failure_leaves_booking_pending() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 2).await;
    h.gateway
        .push_capture(Err(GatewayError::Transport("timeout".into())));

    let err = h
        .services
        .payments
        .confirm(&alice, booking.id, &order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Gateway(_)));
    assert_eq!(h.store.booking(booking.id).unwrap().payment_status, PaymentStatus::Pending);
    assert_eq!(h.store.available(event.id), Some(5));
}

#[tokio::test]
async fn confirm_unknown_booking_is_not_found() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;

    let err = h
        .services
        .payments
        .confirm(&alice, BookingId::new(), "ORDER-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { resource: "Booking", .. }));
}

#[tokio::test]
async fn confirm_by_stranger_is_unauthorized() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let mallory = h.customer("mallory@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;

    let err = h
        .services
        .payments
        .confirm(&mallory, booking.id, &order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert_eq!(h.gateway.capture_calls(), 0);
}

#[tokio::test]
async fn confirm_with_foreign_order_is_rejected() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, _order_id) = h.ordered_booking(&alice, event.id, 1).await;

    let err = h
        .services
        .payments
        .confirm(&alice, booking.id, "SOMEONE-ELSES-ORDER")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationFailed(_)));
    assert_eq!(h.gateway.capture_calls(), 0);
}

/// Option (a): re-check before capture; late bookers fail and pay nothing.
#[tokio::test]
async fn confirm_rechecks_inventory_before_capturing() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let bob = h.customer("bob@example.com").await;
    let event = h.event(1, 1).await;
    let (alice_booking, alice_order) = h.ordered_booking(&alice, event.id, 1).await;
    let (bob_booking, bob_order) = h.ordered_booking(&bob, event.id, 1).await;

    h.services
        .payments
        .confirm(&alice, alice_booking.id, &alice_order)
        .await
        .unwrap();
    let err = h
        .services
        .payments
        .confirm(&bob, bob_booking.id, &bob_order)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InsufficientInventory { available: 0, requested: 1 }));
    assert_eq!(h.gateway.capture_calls(), 1);
    assert_eq!(h.store.booking(bob_booking.id).unwrap().payment_status, PaymentStatus::Pending);
    assert_eq!(h.store.available(event.id), Some(0));
}

#[tokio::test]
async fn expired_booking_is_closed_lazily() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;

    h.clock.advance(Duration::minutes(31));

    let err = h
        .services
        .payments
        .confirm(&alice, booking.id, &order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BookingClosed { status: PaymentStatus::Failed }));
    assert_eq!(h.store.booking(booking.id).unwrap().payment_status, PaymentStatus::Failed);
    assert_eq!(h.gateway.capture_calls(), 0);
    assert_eq!(h.store.available(event.id), Some(5));

    let err = h.services.payments.create_order(&alice, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::BookingClosed { status: PaymentStatus::Failed }));
}

#[tokio::test]
async fn refunded_booking_cannot_be_paid() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let mut booking = h.pending_booking(&alice, event.id, 1).await;
    booking.payment_status = PaymentStatus::Refunded;
    h.store.put_booking(booking.clone());

    let err = h.services.payments.create_order(&alice, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::BookingClosed { status: PaymentStatus::Refunded }));
}

#[tokio::test]
async fn confirmation_email_is_sent() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;

    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();

    // one "complete your payment", one "confirmed"
    let sent = h.notifier.wait_for(2).await;
    assert!(sent.iter().any(|n| n.subject.starts_with("Booking confirmed")));
}

#[tokio::test]
async fn admin_may_confirm_on_behalf_of_owner() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let admin = h.admin().await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 2).await;

    let confirmed = h.services.payments.confirm(&admin, booking.id, &order_id).await.unwrap();
    assert_eq!(confirmed.booking.payment_status, PaymentStatus::Completed);
    assert_eq!(h.store.available(event.id), Some(3));
}

// ============================================================================
// Reminders
// ============================================================================

#[tokio::test]
async fn reminder_is_sent_once() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let admin = h.admin().await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;
    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();
    let before = h.notifier.wait_for(2).await.len();

    let reminded = h.services.payments.send_reminder(&admin, booking.id).await.unwrap();
    assert!(reminded.reminder_sent);
    let reminders = |sent: &[ticketbooth_core::notify::Notification]| {
        sent.iter().filter(|n| n.subject.starts_with("Reminder")).count()
    };
    assert_eq!(reminders(&h.notifier.wait_for(before + 1).await), 1);

    let err = h.services.payments.send_reminder(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadySent));
    assert_eq!(reminders(&h.notifier.sent()), 1);
    assert_eq!(h.notifier.sent().len(), before + 1);
}

#[tokio::test]
async fn reminder_for_unpaid_booking_is_not_paid() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let admin = h.admin().await;
    let event = h.event(5, 5).await;
    let booking = h.pending_booking(&alice, event.id, 1).await;

    let err = h.services.payments.send_reminder(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotPaid));
    assert!(!h.store.booking(booking.id).unwrap().reminder_sent);
}

#[tokio::test]
async fn reminder_requires_admin() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;
    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();

    let err = h.services.payments.send_reminder(&alice, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

/// A reminder whose event cannot be loaded is not marked sent, so it can be retried.
#[tokio::test]
async fn reminder_survives_a_failed_lookup() {
    let h = Harness::new();
    let alice = h.user("alice@example.com", Role::User).await;
    let admin = h.admin().await;
    let missing_event = EventId::new();
    let booking = Booking::issued(
        alice.id,
        missing_event,
        2,
        Money::from_cents(2_500),
        BookingType::Complimentary,
        h.now(),
    )
    .unwrap();
    h.store.put_booking(booking.clone());

    let err = h.services.payments.send_reminder(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { resource: "Event", .. }));
    assert!(!h.store.booking(booking.id).unwrap().reminder_sent);

    let mut event = sample_event(admin.user_id, 10, 8, Money::from_cents(2_500), h.now());
    event.id = missing_event;
    h.store.insert_event(&event).await.unwrap();

    let reminded = h.services.payments.send_reminder(&admin, booking.id).await.unwrap();
    assert!(reminded.reminder_sent);
    let sent = h.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@example.com");
    assert!(sent[0].subject.starts_with("Reminder"));

    let err = h.services.payments.send_reminder(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadySent));
    assert_eq!(h.notifier.sent().len(), 1);
}

/// A store outage during the lookup leaves the flag untouched.
#[tokio::test]
async fn reminder_is_retryable_after_an_outage() {
    let h = Harness::new();
    let alice = h.customer("alice@example.com").await;
    let admin = h.admin().await;
    let event = h.event(5, 5).await;
    let (booking, order_id) = h.ordered_booking(&alice, event.id, 1).await;
    h.services.payments.confirm(&alice, booking.id, &order_id).await.unwrap();
    let before = h.notifier.wait_for(2).await.len();

    h.store.set_unavailable(true);
    let err = h.services.payments.send_reminder(&admin, booking.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    h.store.set_unavailable(false);
    assert!(!h.store.booking(booking.id).unwrap().reminder_sent);

    h.services.payments.send_reminder(&admin, booking.id).await.unwrap();
    assert_eq!(h.notifier.wait_for(before + 1).await.len(), before + 1);
}
