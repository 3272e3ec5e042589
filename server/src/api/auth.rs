//! `/api/auth`: registration, login, current user.

use crate::auth::SessionUser;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use ticketbooth_core::services::{Login, Registration, Session};
use ticketbooth_core::types::UserSummary;
use ticketbooth_web::{ApiJson, WebResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Only ever `user`; anything naming `admin` is refused
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `{ success, token, user }`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: UserSummary,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            token: session.token,
            user: session.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserSummary,
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> WebResult<(StatusCode, Json<SessionResponse>)> {
    let session = state
        .services
        .accounts
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            requested_role: body.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> WebResult<Json<SessionResponse>> {
    let session = state
        .services
        .accounts
        .login(Login {
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok(Json(session.into()))
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, session: SessionUser) -> WebResult<Json<MeResponse>> {
    let user = state.services.accounts.me(&session.actor).await?;
    Ok(Json(MeResponse { success: true, user }))
}
