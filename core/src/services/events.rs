//! Event catalogue service.

use super::Repositories;
use crate::environment::Clock;
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::metrics;
use crate::notify::Notifications;
use crate::store::EventDeletion;
use crate::templates;
use crate::types::{
    Actor, Category, DEFAULT_EVENT_IMAGE, Event, EventChanges, EventDetails, EventId, EventQuery,
    Money, Page, Role,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Input for creating an event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Category
    pub category: Category,
    /// Day of the event
    pub date: DateTime<Utc>,
    /// Start time as displayed
    pub time: String,
    /// Venue
    pub venue: String,
    /// City / address
    pub location: String,
    /// Price per ticket
    pub price: Money,
    /// Capacity
    pub total_tickets: u32,
    /// Initial availability; defaults to capacity
    pub available_tickets: Option<u32>,
    /// Image URL; defaults to a placeholder
    pub image: Option<String>,
}

/// Event catalogue reads and administrator writes
#[derive(Clone)]
pub struct EventService {
    repos: Repositories,
    notifications: Notifications,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Create the service
    #[must_use]
    pub fn new(repos: Repositories, notifications: Notifications, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            notifications,
            clock,
        }
    }

    /// Public listing
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list(&self, query: &EventQuery) -> ServiceResult<Page<EventDetails>> {
        Ok(self.repos.events.list_events(query).await?)
    }

    /// Public single read
    ///
    /// # Errors
    ///
    /// `NotFound`; store failures.
    pub async fn get(&self, event_id: EventId) -> ServiceResult<EventDetails> {
        self.repos
            .events
            .find_event_details(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))
    }

    /// Create an event owned by the acting administrator and announce it to
    /// every regular user.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-administrators; `ValidationFailed`.
    #[tracing::instrument(skip(self, input), fields(user_id = %actor.user_id, title = %input.title))]
    pub async fn create(&self, actor: &Actor, input: NewEvent) -> ServiceResult<EventDetails> {
        if !actor.is_admin() {
            return Err(ServiceError::unauthorized());
        }
        let mut validator = Validator::new();
        validator
            .check(!input.title.trim().is_empty(), "title", "Please add an event title")
            .check(!input.description.trim().is_empty(), "description", "Please add a description")
            .check(!input.time.trim().is_empty(), "time", "Please add an event time")
            .check(!input.venue.trim().is_empty(), "venue", "Please add a venue")
            .check(!input.location.trim().is_empty(), "location", "Please add a location")
            .check(input.total_tickets >= 1, "totalTickets", "Total tickets must be at least 1");
        if input.available_tickets.is_some_and(|available| available > input.total_tickets) {
            validator.fail("availableTickets", "Available tickets cannot exceed total tickets");
        }
        validator.finish()?;

        let event = Event {
            id: EventId::new(),
            title: input.title.trim().to_owned(),
            description: input.description,
            category: input.category,
            date: input.date,
            time: input.time,
            venue: input.venue,
            location: input.location,
            price: input.price,
            total_tickets: input.total_tickets,
            available_tickets: input.available_tickets.unwrap_or(input.total_tickets),
            image: input
                .image
                .filter(|image| !image.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_IMAGE.to_owned()),
            created_by: actor.user_id,
            created_at: self.clock.now(),
        };
        self.repos.events.insert_event(&event).await?;
        metrics::record_event_created();
        tracing::info!(event_id = %event.id, total_tickets = event.total_tickets, "Event created");

        self.announce(&event).await;
        self.get(event.id).await
    }

    /// Apply whitelisted changes. Inventory counters and ownership cannot be
    /// changed here.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `ValidationFailed`, `NotFound`.
    #[tracing::instrument(skip(self, changes), fields(user_id = %actor.user_id))]
    pub async fn update(&self, actor: &Actor, event_id: EventId, changes: EventChanges) -> ServiceResult<EventDetails> {
        if !actor.is_admin() {
            return Err(ServiceError::unauthorized());
        }
        let blank = |value: &Option<String>| value.as_ref().is_some_and(|v| v.trim().is_empty());
        Validator::new()
            .check(!blank(&changes.title), "title", "Title cannot be empty")
            .check(!blank(&changes.description), "description", "Description cannot be empty")
            .check(!blank(&changes.time), "time", "Time cannot be empty")
            .check(!blank(&changes.venue), "venue", "Venue cannot be empty")
            .check(!blank(&changes.location), "location", "Location cannot be empty")
            .finish()?;

        self.repos
            .events
            .update_event(event_id, &changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("Event", event_id))?;
        tracing::info!(%event_id, "Event updated");
        self.get(event_id).await
    }

    /// Delete an event that no booking references
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `Conflict` while bookings exist.
    #[tracing::instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, event_id: EventId) -> ServiceResult<()> {
        if !actor.is_admin() {
            return Err(ServiceError::unauthorized());
        }
        match self.repos.events.delete_event(event_id).await? {
            EventDeletion::Deleted => {
                tracing::info!(%event_id, "Event deleted");
                Ok(())
            }
            EventDeletion::NotFound => Err(ServiceError::not_found("Event", event_id)),
            EventDeletion::HasBookings(count) => Err(ServiceError::Conflict(format!(
                "Event has {count} booking(s); delete them before deleting the event"
            ))),
        }
    }

    async fn announce(&self, event: &Event) {
        match self.repos.users.list_users_by_role(Role::User).await {
            Ok(users) => {
                tracing::debug!(event_id = %event.id, recipients = users.len(), "Announcing new event");
                for user in users {
                    self.notifications.dispatch(templates::new_event(&user.summary(), event));
                }
            }
            Err(error) => tracing::warn!(event_id = %event.id, %error, "Could not load users; event not announced"),
        }
    }
}
