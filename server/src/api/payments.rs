//! `/api/payments`: order creation, confirmation and reminders.

use super::{BookingView, MessageResponse};
use crate::auth::{RequireAdmin, SessionUser};
use crate::state::AppState;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use ticketbooth_core::types::BookingId;
use ticketbooth_web::{ApiJson, WebResult};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRef {
    pub booking_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub booking_id: Uuid,
    /// The provider order id returned by `create-intent`
    #[serde(alias = "orderId")]
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    pub order_id: String,
    pub approval_url: String,
    pub booking: BookingView,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: BookingView,
    /// Tickets paid for beyond what inventory held; non-zero needs a refund
    pub oversold: u32,
}

/// `POST /api/payments/create-intent`
pub async fn create_intent(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<BookingRef>,
) -> WebResult<Json<OrderResponse>> {
    let created = state
        .services
        .payments
        .create_order(&session.actor, BookingId::from_uuid(body.booking_id))
        .await?;
    Ok(Json(OrderResponse {
        success: true,
        order_id: created.order.order_id,
        approval_url: created.order.approval_url,
        booking: created.booking.into(),
    }))
}

/// `POST /api/payments/confirm`
pub async fn confirm(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<ConfirmRequest>,
) -> WebResult<Json<ConfirmResponse>> {
    let confirmation = state
        .services
        .payments
        .confirm(
            &session.actor,
            BookingId::from_uuid(body.booking_id),
            &body.payment_intent_id,
        )
        .await?;
    let oversold = confirmation.oversold();
    Ok(Json(ConfirmResponse {
        success: true,
        message: "Payment confirmed",
        data: confirmation.booking.into(),
        oversold,
    }))
}

/// `POST /api/payments/send-reminder`
pub async fn send_reminder(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<BookingRef>,
) -> WebResult<Json<MessageResponse>> {
    state
        .services
        .payments
        .send_reminder(&admin.actor, BookingId::from_uuid(body.booking_id))
        .await?;
    Ok(Json(MessageResponse::new("Reminder sent")))
}
