//! Error responses for HTTP handlers.
//!
//! [`AppError`] is the only error type handlers return. Domain failures arrive
//! as [`ServiceError`] and are mapped to a status, a stable `code` and a
//! human-readable `message`. Internal faults never reach the client: the body
//! carries a generic message and the cause is logged.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;
use ticketbooth_core::{FieldError, ServiceError};

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Error returned by every handler.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    available: Option<u32>,
    errors: Vec<FieldError>,
    /// Logged, never serialized
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Build an error with no extra payload.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            available: None,
            errors: Vec::new(),
            source: None,
        }
    }

    /// Attach the underlying cause for the log.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 400 with field-level detail
    #[must_use]
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = match errors.as_slice() {
            [only] => only.message.clone(),
            _ => "Validation failed".to_string(),
        };
        Self {
            errors,
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        }
    }

    /// 401
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 404
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 409
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 500 with the generic message
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", INTERNAL_MESSAGE)
    }

    /// 503
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// HTTP status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Client-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::NotFound { .. } => Self::not_found(message),
            ServiceError::ValidationFailed(errors) => Self::validation(errors),
            ServiceError::Unauthorized(_) => Self::unauthorized(message),
            ServiceError::Forbidden(_) => Self::forbidden(message),
            ServiceError::InsufficientInventory { available, .. } => Self {
                available: Some(available),
                ..Self::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_INVENTORY", message)
            },
            ServiceError::AlreadyPaid => Self::new(StatusCode::BAD_REQUEST, "ALREADY_PAID", message),
            ServiceError::PaymentNotCompleted { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "PAYMENT_NOT_COMPLETED", message)
            }
            ServiceError::AlreadySent => Self::new(StatusCode::BAD_REQUEST, "ALREADY_SENT", message),
            ServiceError::NotPaid => Self::new(StatusCode::BAD_REQUEST, "NOT_PAID", message),
            ServiceError::UserNotFound { .. } => Self::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", message),
            ServiceError::BookingClosed { .. } => Self::new(StatusCode::BAD_REQUEST, "BOOKING_CLOSED", message),
            ServiceError::Conflict(_) => Self::conflict(message),
            ServiceError::Store(_) | ServiceError::Gateway(_) | ServiceError::Auth(_) => {
                Self::internal().with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON whose shape is wrong, including unknown fields
            JsonRejection::JsonDataError(_) => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", rejection.body_text())
            }
            _ => Self::bad_request(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal().with_source(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<u32>,
    #[serde(skip_serializing_if = "no_errors")]
    errors: &'a [FieldError],
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_errors(errors: &&[FieldError]) -> bool {
    errors.is_empty()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = self.code,
                error = ?self.source,
                "Request failed"
            );
        } else {
            tracing::debug!(status = %self.status, code = self.code, message = %self.message, "Request rejected");
        }
        metrics::counter!("ticketbooth_http_errors_total", "code" => self.code).increment(1);

        let body = ErrorBody {
            success: false,
            code: self.code,
            message: &self.message,
            available: self.available,
            errors: &self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use ticketbooth_core::gateway::GatewayError;
    use ticketbooth_core::types::PaymentStatus;

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn insufficient_inventory_carries_available() {
        let error = AppError::from(ServiceError::InsufficientInventory { available: 0, requested: 1 });
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_INVENTORY");
        assert_eq!(body["available"], 0);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn validation_lists_fields() {
        let error = AppError::from(ServiceError::ValidationFailed(vec![
            FieldError::new("name", "Please add a name"),
            FieldError::new("email", "Please add a valid email"),
        ]));
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][1]["field"], "email");
    }

    #[tokio::test]
    async fn single_field_error_becomes_message() {
        let error = AppError::from(ServiceError::invalid("email", "User already exists"));
        let (_, body) = body_of(error).await;
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn internal_faults_hide_their_cause() {
        let error = AppError::from(ServiceError::Gateway(GatewayError::Transport(
            "connect to api-m.sandbox.paypal.com:443 refused".to_string(),
        )));
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(body.get("available").is_none());
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (ServiceError::not_found("Event", "x"), StatusCode::NOT_FOUND),
            (ServiceError::unauthorized(), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::AlreadyPaid, StatusCode::BAD_REQUEST),
            (ServiceError::AlreadySent, StatusCode::BAD_REQUEST),
            (ServiceError::NotPaid, StatusCode::BAD_REQUEST),
            (
                ServiceError::PaymentNotCompleted { status: "DECLINED".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::BookingClosed { status: PaymentStatus::Failed },
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::Conflict("busy".into()), StatusCode::CONFLICT),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status(), expected);
        }
    }
}
