//! Authentication extractors.
//!
//! ```rust,ignore
//! async fn my_bookings(session: SessionUser) -> WebResult<Json<...>> { ... }
//! async fn create_event(admin: RequireAdmin, ...) -> WebResult<...> { ... }
//! ```

use crate::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use ticketbooth_core::types::{Actor, UserSummary};
use ticketbooth_web::{AppError, BearerToken, CorrelationId};

/// Authenticated caller.
///
/// Verifies the bearer token and loads the account it names; 401 otherwise.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// Who is acting, for the services
    pub actor: Actor,
    /// Public view of the account
    pub user: UserSummary,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let CorrelationId(correlation_id) = match CorrelationId::from_request_parts(parts, state).await {
            Ok(id) => id,
            Err(never) => match never {},
        };

        let (actor, user) = state.services.accounts.authenticate(&bearer.0).await.map_err(|e| {
            tracing::debug!(%correlation_id, error = %e, "Token rejected");
            AppError::from(e)
        })?;

        Ok(Self { actor, user })
    }
}

/// Authenticated administrator; 403 for anyone else.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        if !session.actor.is_admin() {
            tracing::warn!(user_id = %session.actor.user_id, "Admin route refused");
            return Err(AppError::forbidden(format!(
                "User role {} is not authorized to access this route",
                session.actor.role
            )));
        }
        Ok(Self(session))
    }
}
