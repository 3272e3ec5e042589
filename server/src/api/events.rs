//! `/api/events`: public catalogue reads, administrator writes.

use super::{DataResponse, EventView, MessageResponse, parse_date, parse_price};
use crate::auth::RequireAdmin;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ticketbooth_core::FieldError;
use ticketbooth_core::services::NewEvent;
use ticketbooth_core::types::{Category, EventChanges, EventId, EventQuery};
use ticketbooth_web::{ApiJson, ApiPath, ApiQuery, AppError, WebResult};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    fn into_query(self) -> Result<EventQuery, AppError> {
        // The frontend sends `all` for "no filter"
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("" | "all") => None,
            Some(raw) => Some(
                Category::from_str(&raw.to_lowercase())
                    .map_err(|e| AppError::validation(vec![FieldError::new("category", e.to_string())]))?,
            ),
        };
        Ok(EventQuery::new(category, self.search, self.page, self.limit))
    }
}

/// `{ success, count, total, page, pages, data }`
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
    pub data: Vec<EventView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<Category>,
    pub date: Option<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub location: String,
    pub price: Option<f64>,
    pub total_tickets: Option<u32>,
    pub available_tickets: Option<u32>,
    pub image: Option<String>,
}

impl CreateEventRequest {
    fn into_new_event(self) -> Result<NewEvent, AppError> {
        let mut errors = Vec::new();
        let category = self
            .category
            .ok_or_else(|| FieldError::new("category", "Please select a category"));
        let date = self
            .date
            .ok_or_else(|| FieldError::new("date", "Please add an event date"))
            .and_then(|raw| parse_date("date", &raw));
        let price = self
            .price
            .ok_or_else(|| FieldError::new("price", "Please add a ticket price"))
            .and_then(|amount| parse_price("price", amount));
        let total_tickets = self
            .total_tickets
            .ok_or_else(|| FieldError::new("totalTickets", "Please add total tickets"));

        let category = category.map_err(|e| errors.push(e)).ok();
        let date = date.map_err(|e| errors.push(e)).ok();
        let price = price.map_err(|e| errors.push(e)).ok();
        let total_tickets = total_tickets.map_err(|e| errors.push(e)).ok();

        match (category, date, price, total_tickets) {
            (Some(category), Some(date), Some(price), Some(total_tickets)) => Ok(NewEvent {
                title: self.title,
                description: self.description,
                category,
                date,
                time: self.time,
                venue: self.venue,
                location: self.location,
                price,
                total_tickets,
                available_tickets: self.available_tickets,
                image: self.image,
            }),
            _ => Err(AppError::validation(errors)),
        }
    }
}

/// Editable fields only; counters and ownership are rejected as unknown.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}

impl UpdateEventRequest {
    fn into_changes(self) -> Result<EventChanges, AppError> {
        let mut errors = Vec::new();
        let date = match self.date.as_deref().map(|raw| parse_date("date", raw)).transpose() {
            Ok(date) => date,
            Err(e) => {
                errors.push(e);
                None
            }
        };
        let price = match self.price.map(|amount| parse_price("price", amount)).transpose() {
            Ok(price) => price,
            Err(e) => {
                errors.push(e);
                None
            }
        };
        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }
        Ok(EventChanges {
            title: self.title,
            description: self.description,
            category: self.category,
            date,
            time: self.time,
            venue: self.venue,
            location: self.location,
            price,
            image: self.image,
        })
    }
}

/// `GET /api/events`
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> WebResult<Json<EventListResponse>> {
    let query = params.into_query()?;
    let page = state.services.events.list(&query).await?;
    let pages = page.pages();
    let (total, page_number) = (page.total, page.page);
    let data: Vec<EventView> = page.items.into_iter().map(EventView::from).collect();
    Ok(Json(EventListResponse {
        success: true,
        count: data.len(),
        total,
        page: page_number,
        pages,
        data,
    }))
}

/// `GET /api/events/:id`
pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> WebResult<Json<DataResponse<EventView>>> {
    let details = state.services.events.get(EventId::from_uuid(id)).await?;
    Ok(Json(DataResponse::new(details.into())))
}

/// `POST /api/events`
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateEventRequest>,
) -> WebResult<(StatusCode, Json<DataResponse<EventView>>)> {
    let input = body.into_new_event()?;
    let details = state.services.events.create(&admin.actor, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(details.into()))))
}

/// `PUT /api/events/:id`
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateEventRequest>,
) -> WebResult<Json<DataResponse<EventView>>> {
    let changes = body.into_changes()?;
    let details = state
        .services
        .events
        .update(&admin.actor, EventId::from_uuid(id), changes)
        .await?;
    Ok(Json(DataResponse::new(details.into())))
}

/// `DELETE /api/events/:id`
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
) -> WebResult<Json<MessageResponse>> {
    state.services.events.delete(&admin.actor, EventId::from_uuid(id)).await?;
    Ok(Json(MessageResponse::new("Event deleted")))
}
