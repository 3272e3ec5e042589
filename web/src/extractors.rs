//! Custom extractors.
//!
//! - [`CorrelationId`]: the id assigned by the middleware, or a fresh one
//! - [`BearerToken`]: the token from `Authorization: Bearer <token>`
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: axum's extractors with rejections
//!   rendered as [`AppError`] bodies

use crate::error::AppError;
use crate::middleware::correlation_id_from;
use axum::extract::{FromRequest, FromRequestParts};
use axum::{async_trait, http::header, http::request::Parts};
use uuid::Uuid;

/// JSON body; malformed or mistyped bodies become 400s.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .unwrap_or_else(|| correlation_id_from(&parts.headers));
        Ok(Self(id))
    }
}

/// Raw bearer token. Rejects with 401 when absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Not authorized, no token"))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("Not authorized, no token"))?;

        Ok(Self(token.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).expect("request").into_parts().0
    }

    #[tokio::test]
    async fn bearer_token_is_extracted() {
        let mut parts = parts(Request::builder().header("Authorization", "Bearer abc.def"));
        let token = BearerToken::from_request_parts(&mut parts, &())
            .await
            .expect("token");
        assert_eq!(token.0, "abc.def");
    }

    #[tokio::test]
    async fn missing_or_wrong_scheme_is_unauthorized() {
        for builder in [
            Request::builder(),
            Request::builder().header("Authorization", "Basic dXNlcjpwdw=="),
            Request::builder().header("Authorization", "Bearer "),
        ] {
            let mut parts = parts(builder);
            let err = BearerToken::from_request_parts(&mut parts, &())
                .await
                .expect_err("rejected");
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn correlation_id_prefers_extension() {
        let assigned = Uuid::new_v4();
        let mut parts = parts(Request::builder().header("X-Correlation-ID", Uuid::new_v4().to_string()));
        parts.extensions.insert(assigned);
        let id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(id.0, assigned);
    }

    #[derive(Debug, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tickets {
        #[allow(dead_code)]
        tickets: u32,
    }

    #[tokio::test]
    async fn unknown_json_field_is_a_validation_error() {
        let request = Request::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"tickets":2,"paymentStatus":"completed"}"#))
            .expect("request");
        let err = ApiJson::<Tickets>::from_request(request, &())
            .await
            .expect_err("rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_path_is_bad_request() {
        let app = axum::Router::new().route(
            "/bookings/:id",
            axum::routing::get(|ApiPath(id): ApiPath<Uuid>| async move { id.to_string() }),
        );
        let response = tower::ServiceExt::oneshot(
            app,
            Request::builder()
                .uri("/bookings/not-a-uuid")
                .body(axum::body::Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn correlation_id_falls_back_to_header() {
        let sent = Uuid::new_v4();
        let mut parts = parts(Request::builder().header("X-Correlation-ID", sent.to_string()));
        let id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(id.0, sent);
    }
}
