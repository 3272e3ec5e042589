//! Payment Reconciliation Service.
//!
//! Drives a regular booking from `pending` to `completed`:
//!
//! ```text
//! create_order ──► payer approves at provider ──► confirm
//!                                                   │
//!                     completed already? ──yes──► return existing result
//!                                                   │ no
//!                     expired / closed? ───yes──► BookingClosed
//!                                                   │ no
//!                     inventory covers it? ─no──► InsufficientInventory
//!                                                   │ yes
//!                     capture succeeded? ──no───► PaymentNotCompleted (stays pending)
//!                                                   │ yes
//!                     ConfirmPayment ledger entry (status flip + commit, once)
//! ```
//!
//! The status flip and the inventory commit are one conditional write guarded
//! by the current status, so concurrent or repeated confirms decrement at most
//! once.

use super::Repositories;
use crate::environment::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::gateway::{OrderRequest, PaymentGateway, PaymentOrder};
use crate::ledger::{InventoryChange, InventoryLedger};
use crate::metrics;
use crate::notify::Notifications;
use crate::store::{LedgerOutcome, ReminderMark};
use crate::templates;
use crate::types::{Actor, Booking, BookingId, Event, PaymentStatus};
use std::sync::Arc;

/// Result of [`PaymentService::create_order`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCreated {
    /// Provider order
    pub order: PaymentOrder,
    /// Booking with its payment reference recorded
    pub booking: Booking,
}

/// How a confirm ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call completed the booking and committed its tickets
    Confirmed {
        /// Inventory movement applied
        change: InventoryChange,
    },
    /// The booking was already completed; nothing moved
    AlreadyConfirmed,
}

/// Result of [`PaymentService::confirm`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// The completed booking
    pub booking: Booking,
    /// What this call did
    pub outcome: ConfirmOutcome,
}

impl Confirmation {
    /// Tickets paid for beyond remaining inventory (zero unless a race slipped
    /// past the pre-capture check)
    #[must_use]
    pub const fn oversold(&self) -> u32 {
        match self.outcome {
            ConfirmOutcome::Confirmed { change } => change.shortfall(),
            ConfirmOutcome::AlreadyConfirmed => 0,
        }
    }
}

/// Order creation, confirmation and reminders
#[derive(Clone)]
pub struct PaymentService {
    repos: Repositories,
    ledger: InventoryLedger,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Notifications,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    /// Create the service
    #[must_use]
    pub fn new(
        repos: Repositories,
        ledger: InventoryLedger,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Notifications,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            ledger,
            gateway,
            notifications,
            clock,
        }
    }

    /// Open a provider order for the exact booking total. Booking owner only.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Unauthorized`
    /// - `AlreadyPaid` if the booking is completed
    /// - `BookingClosed` if it is failed, refunded or past its payment window
    /// - `InsufficientInventory` if stock ran out since the booking was made
    /// - `Gateway` on provider failure
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn create_order(&self, actor: &Actor, booking_id: BookingId) -> ServiceResult<OrderCreated> {
        let mut booking = self.load(booking_id).await?;
        if booking.user_id != actor.user_id {
            return Err(ServiceError::unauthorized());
        }
        if booking.is_completed() {
            return Err(ServiceError::AlreadyPaid);
        }
        self.ensure_open(&booking).await?;

        self.ledger.reserve(booking.event_id, booking.tickets).await?;
        let event = self.load_event(&booking).await?;

        let order = self
            .gateway
            .create_order(&OrderRequest {
                booking_id,
                event_id: booking.event_id,
                description: format!("{} - {} ticket(s)", event.title, booking.tickets),
                amount: booking.total_amount,
            })
            .await?;

        if !self
            .repos
            .bookings
            .set_payment_reference(booking_id, &order.order_id)
            .await?
        {
            tracing::warn!(%booking_id, "Booking left pending state while its order was created");
        }
        booking.payment_reference = Some(order.order_id.clone());

        tracing::info!(
            %booking_id,
            order_id = %order.order_id,
            amount_cents = booking.total_amount.cents(),
            "Payment order created"
        );
        Ok(OrderCreated { order, booking })
    }

    /// Capture the provider order and, exactly once, complete the booking
    /// and commit its tickets. Booking owner or administrator.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `Unauthorized`
    /// - `ValidationFailed` if `order_id` belongs to another order than the
    ///   one created for this booking
    /// - `BookingClosed` if the booking is failed, refunded or expired
    /// - `InsufficientInventory` if inventory no longer covers it (nothing is captured)
    /// - `PaymentNotCompleted` if the provider did not report success (booking stays pending)
    /// - `Gateway` on provider failure (booking stays pending)
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn confirm(&self, actor: &Actor, booking_id: BookingId, order_id: &str) -> ServiceResult<Confirmation> {
        let booking = self.load(booking_id).await?;
        if !actor.can_access(booking.user_id) {
            return Err(ServiceError::unauthorized());
        }
        if booking.is_completed() {
            tracing::info!(%booking_id, "Booking already confirmed; nothing to do");
            metrics::record_payment("duplicate");
            return Ok(Confirmation {
                booking,
                outcome: ConfirmOutcome::AlreadyConfirmed,
            });
        }
        self.ensure_open(&booking).await?;

        if order_id.trim().is_empty() {
            return Err(ServiceError::invalid("orderId", "Order ID is required"));
        }
        if booking
            .payment_reference
            .as_deref()
            .is_some_and(|reference| reference != order_id)
        {
            return Err(ServiceError::invalid("orderId", "Order does not belong to this booking"));
        }

        if let Err(error) = self.ledger.reserve(booking.event_id, booking.tickets).await {
            metrics::record_payment("rejected");
            return Err(error);
        }

        let status = self.gateway.capture_order(order_id).await.inspect_err(|error| {
            tracing::warn!(%booking_id, %order_id, %error, "Capture failed; booking stays pending");
        })?;
        if !status.is_success() {
            metrics::record_payment("not_completed");
            tracing::info!(%booking_id, %order_id, status = %status, "Capture did not complete");
            return Err(ServiceError::PaymentNotCompleted {
                status: status.to_string(),
            });
        }

        let receipt = self.ledger.confirm_payment(booking_id, order_id.to_owned()).await?;
        let confirmed = match receipt.outcome {
            LedgerOutcome::Applied => {
                let (Some(booking), Some(change)) = (receipt.booking, receipt.inventory) else {
                    return Err(ServiceError::not_found("Event", booking.event_id));
                };
                Confirmation {
                    booking,
                    outcome: ConfirmOutcome::Confirmed { change },
                }
            }
            LedgerOutcome::Unchanged => {
                metrics::record_payment("duplicate");
                return Ok(Confirmation {
                    booking: receipt.booking.unwrap_or(booking),
                    outcome: ConfirmOutcome::AlreadyConfirmed,
                });
            }
            LedgerOutcome::Rejected => {
                let status = receipt
                    .booking
                    .map_or(PaymentStatus::Refunded, |b| b.payment_status);
                tracing::error!(%booking_id, %order_id, %status, "Payment captured for a closed booking");
                metrics::record_payment("rejected");
                return Err(ServiceError::BookingClosed { status });
            }
            LedgerOutcome::Missing => {
                tracing::error!(%booking_id, %order_id, "Payment captured but booking or event vanished");
                metrics::record_payment("rejected");
                return Err(ServiceError::not_found("Booking", booking_id));
            }
        };

        metrics::record_payment("confirmed");
        metrics::record_revenue(confirmed.booking.total_amount.cents());
        tracing::info!(
            %booking_id,
            event_id = %confirmed.booking.event_id,
            tickets = confirmed.booking.tickets,
            oversold = confirmed.oversold(),
            "Payment confirmed"
        );

        self.notify(&confirmed.booking, templates::booking_confirmed).await;
        Ok(confirmed)
    }

    /// Send the event reminder for a paid booking, at most once. Administrator only.
    ///
    /// Everything the message needs is loaded before the flag is claimed, so a
    /// failed lookup leaves the booking eligible for another attempt. Claiming
    /// the flag is atomic, so two concurrent calls cannot both send.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `NotPaid`, `AlreadySent`.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn send_reminder(&self, actor: &Actor, booking_id: BookingId) -> ServiceResult<Booking> {
        if !actor.is_admin() {
            return Err(ServiceError::unauthorized());
        }
        let current = self.load(booking_id).await?;
        if !current.is_completed() {
            return Err(ServiceError::NotPaid);
        }
        if current.reminder_sent {
            return Err(ServiceError::AlreadySent);
        }
        let event = self.load_event(&current).await?;
        let user = self
            .repos
            .users
            .find_user(current.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", current.user_id))?;

        let booking = match self.repos.bookings.mark_reminder_sent(booking_id).await? {
            ReminderMark::Marked(booking) => booking,
            ReminderMark::AlreadySent => return Err(ServiceError::AlreadySent),
            ReminderMark::NotPaid => return Err(ServiceError::NotPaid),
            ReminderMark::NotFound => return Err(ServiceError::not_found("Booking", booking_id)),
        };
        self.notifications
            .dispatch(templates::event_reminder(&user.summary(), &event, &booking));

        tracing::info!(%booking_id, "Reminder dispatched");
        Ok(booking)
    }

    async fn load(&self, booking_id: BookingId) -> ServiceResult<Booking> {
        self.repos
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking", booking_id))
    }

    async fn load_event(&self, booking: &Booking) -> ServiceResult<Event> {
        self.repos
            .events
            .find_event(booking.event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", booking.event_id))
    }

    /// Refuse closed bookings, expiring a pending one whose window has passed
    async fn ensure_open(&self, booking: &Booking) -> ServiceResult<()> {
        match booking.payment_status {
            PaymentStatus::Failed | PaymentStatus::Refunded => Err(ServiceError::BookingClosed {
                status: booking.payment_status,
            }),
            PaymentStatus::Pending if booking.is_expired(self.clock.now()) => {
                if self.repos.bookings.expire_booking(booking.id, self.clock.now()).await? {
                    metrics::record_bookings_expired(1);
                    tracing::info!(booking_id = %booking.id, "Pending booking expired");
                }
                Err(ServiceError::BookingClosed {
                    status: PaymentStatus::Failed,
                })
            }
            PaymentStatus::Pending | PaymentStatus::Completed => Ok(()),
        }
    }

    async fn notify(
        &self,
        booking: &Booking,
        template: fn(&crate::types::UserSummary, &Event, &Booking) -> crate::notify::Notification,
    ) {
        let user = self.repos.users.find_user(booking.user_id).await;
        let event = self.repos.events.find_event(booking.event_id).await;
        match (user, event) {
            (Ok(Some(user)), Ok(Some(event))) => {
                self.notifications.dispatch(template(&user.summary(), &event, booking));
            }
            _ => tracing::warn!(booking_id = %booking.id, "Could not load booker or event; skipping notification"),
        }
    }
}
