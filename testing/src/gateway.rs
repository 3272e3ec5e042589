//! Scripted payment gateway.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use ticketbooth_core::gateway::{CaptureStatus, GatewayError, OrderRequest, PaymentGateway, PaymentOrder};

/// Gateway double whose capture answers are queued by the test.
///
/// With nothing queued every capture answers `COMPLETED`.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    captures: Mutex<VecDeque<Result<CaptureStatus, GatewayError>>>,
    order_failure: Mutex<Option<GatewayError>>,
    orders: Mutex<Vec<OrderRequest>>,
    capture_calls: AtomicUsize,
    capture_delay: Mutex<Option<Duration>>,
}

impl ScriptedGateway {
    /// A gateway that approves everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer of the next capture
    pub fn push_capture(&self, answer: Result<CaptureStatus, GatewayError>) {
        self.captures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
    }

    /// Make every order creation fail with `error` until cleared
    pub fn fail_orders(&self, error: Option<GatewayError>) {
        *self.order_failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Sleep this long inside every capture, to widen race windows
    pub fn delay_captures(&self, delay: Duration) {
        *self.capture_delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Orders created so far
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of capture calls so far
    #[must_use]
    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder, GatewayError> {
        if let Some(error) = self.order_failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(error);
        }
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        orders.push(request.clone());
        let order_id = format!("ORDER-{}", orders.len());
        Ok(PaymentOrder {
            approval_url: format!("https://payments.test/approve/{order_id}"),
            order_id,
        })
    }

    async fn capture_order(&self, _order_id: &str) -> Result<CaptureStatus, GatewayError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.capture_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.captures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Ok(CaptureStatus::Completed))
    }
}
