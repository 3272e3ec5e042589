//! Business metrics.
//!
//! Recorded through the `metrics` facade; the server binary installs the
//! Prometheus exporter. With no recorder installed these calls are no-ops.
//!
//! # Exported Metrics
//!
//! - `ticketbooth_bookings_total{type,status}` - bookings created, by type and initial status
//! - `ticketbooth_payments_total{outcome}` - confirm attempts by outcome
//! - `ticketbooth_payment_revenue_cents_total` - captured revenue in cents
//! - `ticketbooth_tickets_committed_total` - tickets taken from inventory
//! - `ticketbooth_tickets_refunded_total` - tickets returned to inventory
//! - `ticketbooth_oversold_tickets_total` - tickets paid for beyond inventory
//! - `ticketbooth_notifications_failed_total` - swallowed notification failures
//! - `ticketbooth_pending_bookings_expired_total` - pending bookings marked failed
//! - `ticketbooth_events_created_total` - events created

use crate::types::{BookingType, PaymentStatus};
use metrics::describe_counter;

/// Register descriptions for every business metric.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "ticketbooth_bookings_total",
        "Bookings created, by booking type and initial payment status"
    );
    describe_counter!(
        "ticketbooth_payments_total",
        "Payment confirmation attempts by outcome (confirmed, duplicate, not_completed, rejected)"
    );
    describe_counter!(
        "ticketbooth_payment_revenue_cents_total",
        "Revenue from reconciled payments in cents"
    );
    describe_counter!(
        "ticketbooth_tickets_committed_total",
        "Tickets taken from event inventory"
    );
    describe_counter!(
        "ticketbooth_tickets_refunded_total",
        "Tickets returned to event inventory"
    );
    describe_counter!(
        "ticketbooth_oversold_tickets_total",
        "Tickets paid for after inventory reached zero"
    );
    describe_counter!(
        "ticketbooth_notifications_failed_total",
        "Notifications that could not be delivered"
    );
    describe_counter!(
        "ticketbooth_pending_bookings_expired_total",
        "Pending bookings marked failed after their payment window"
    );
    describe_counter!(
        "ticketbooth_events_created_total",
        "Events created"
    );

    tracing::info!("Business metrics registered");
}

/// A booking was created
pub fn record_booking_created(booking_type: BookingType, status: PaymentStatus) {
    metrics::counter!(
        "ticketbooth_bookings_total",
        "type" => booking_type.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// A confirm attempt finished with `outcome`
pub fn record_payment(outcome: &'static str) {
    metrics::counter!("ticketbooth_payments_total", "outcome" => outcome).increment(1);
}

/// A payment of `amount_cents` was reconciled
pub fn record_revenue(amount_cents: u64) {
    metrics::counter!("ticketbooth_payment_revenue_cents_total").increment(amount_cents);
}

/// Tickets left inventory
pub fn record_tickets_committed(tickets: u32) {
    metrics::counter!("ticketbooth_tickets_committed_total").increment(u64::from(tickets));
}

/// Tickets came back to inventory
pub fn record_tickets_refunded(tickets: u32) {
    metrics::counter!("ticketbooth_tickets_refunded_total").increment(u64::from(tickets));
}

/// A commit clamped at zero
pub fn record_oversold(tickets: u32) {
    metrics::counter!("ticketbooth_oversold_tickets_total").increment(u64::from(tickets));
}

/// A notification was dropped
pub fn record_notification_failed() {
    metrics::counter!("ticketbooth_notifications_failed_total").increment(1);
}

/// Pending bookings expired
pub fn record_bookings_expired(count: usize) {
    metrics::counter!("ticketbooth_pending_bookings_expired_total").increment(count as u64);
}

/// An event was created
pub fn record_event_created() {
    metrics::counter!("ticketbooth_events_created_total").increment(1);
}
