//! Application state shared by every handler.

use axum::extract::FromRef;
use std::sync::Arc;
use ticketbooth_core::services::Services;
use ticketbooth_core::store::BookingRepository;

/// Cloned per request; everything inside is `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    /// Domain services
    pub services: Services,
    /// Used by the readiness probe to ping the database
    pub health: Arc<dyn BookingRepository>,
}

impl AppState {
    /// Create the state
    #[must_use]
    pub fn new(services: Services, health: Arc<dyn BookingRepository>) -> Self {
        Self { services, health }
    }
}

impl FromRef<AppState> for Services {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}
