//! `/api/bookings`: reservation, reads, owner edits, deletion and
//! administrator-issued bookings.

use super::{BookingView, DataResponse};
use crate::auth::{RequireAdmin, SessionUser};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use ticketbooth_core::services::{BookingChanges, ComplimentaryRequest};
use ticketbooth_core::types::{BookingId, BookingType, EventId};
use ticketbooth_web::{ApiJson, ApiPath, WebResult};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub event_id: Uuid,
    pub tickets: u32,
}

/// Only the ticket count can be edited.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBookingRequest {
    pub tickets: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplimentaryBookingRequest {
    pub event_id: Uuid,
    pub tickets: u32,
    pub user_email: String,
    #[serde(default = "default_booking_type")]
    pub booking_type: BookingType,
}

const fn default_booking_type() -> BookingType {
    BookingType::Complimentary
}

/// `{ success, count, data }`
#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
pub struct BookingDeletedResponse {
    pub success: bool,
    pub message: &'static str,
    /// Tickets returned to the event's inventory
    pub refunded: u32,
}

#[derive(Debug, Serialize)]
pub struct ComplimentaryResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: BookingView,
}

/// `GET /api/bookings`
pub async fn list(State(state): State<AppState>, session: SessionUser) -> WebResult<Json<BookingListResponse>> {
    let bookings = state.services.bookings.list(&session.actor).await?;
    let data: Vec<BookingView> = bookings.into_iter().map(BookingView::from).collect();
    Ok(Json(BookingListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// `GET /api/bookings/:id`
pub async fn get(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> WebResult<Json<DataResponse<BookingView>>> {
    let details = state
        .services
        .bookings
        .get(&session.actor, BookingId::from_uuid(id))
        .await?;
    Ok(Json(DataResponse::new(details.into())))
}

/// `POST /api/bookings`
pub async fn create(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(body): ApiJson<CreateBookingRequest>,
) -> WebResult<(StatusCode, Json<DataResponse<BookingView>>)> {
    let booking = state
        .services
        .reservations
        .create_booking(&session.actor, EventId::from_uuid(body.event_id), body.tickets)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(booking.into()))))
}

/// `PUT /api/bookings/:id`
pub async fn update(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateBookingRequest>,
) -> WebResult<Json<DataResponse<BookingView>>> {
    let details = state
        .services
        .bookings
        .update(
            &session.actor,
            BookingId::from_uuid(id),
            BookingChanges { tickets: body.tickets },
        )
        .await?;
    Ok(Json(DataResponse::new(details.into())))
}

/// `DELETE /api/bookings/:id`
pub async fn delete(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> WebResult<Json<BookingDeletedResponse>> {
    let cancellation = state
        .services
        .bookings
        .delete(&session.actor, BookingId::from_uuid(id))
        .await?;
    Ok(Json(BookingDeletedResponse {
        success: true,
        message: "Booking deleted",
        refunded: cancellation.refunded,
    }))
}

/// `POST /api/bookings/admin/complimentary`
pub async fn complimentary(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<ComplimentaryBookingRequest>,
) -> WebResult<(StatusCode, Json<ComplimentaryResponse>)> {
    let booking = state
        .services
        .complimentary
        .issue(
            &admin.actor,
            ComplimentaryRequest {
                event_id: EventId::from_uuid(body.event_id),
                user_email: body.user_email,
                tickets: body.tickets,
                booking_type: body.booking_type,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ComplimentaryResponse {
            success: true,
            message: "Complimentary booking created successfully",
            data: booking.into(),
        }),
    ))
}
