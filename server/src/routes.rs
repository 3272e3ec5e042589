//! Router configuration.

use crate::api::{auth, bookings, events, health, payments};
use crate::state::AppState;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use ticketbooth_web::correlation_id_layer;

/// Build the complete router.
///
/// Everything lives under `/api`. Public: health, auth, event reads.
/// Everything else needs a bearer token; admin routes check the role in
/// their extractor.
pub fn build_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Identity
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Catalogue
        .route("/events", get(events::list).post(events::create))
        .route("/events/:id", get(events::get).put(events::update).delete(events::delete))
        // Bookings
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/bookings/admin/complimentary", post(bookings::complimentary))
        .route(
            "/bookings/:id",
            get(bookings::get).put(bookings::update).delete(bookings::delete),
        )
        // Payments
        .route("/payments/create-intent", post(payments::create_intent))
        .route("/payments/confirm", post(payments::confirm))
        .route("/payments/send-reminder", post(payments::send_reminder));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_allowed_origins))
        .layer(correlation_id_layer())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
