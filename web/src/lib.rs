//! Axum glue for Ticketbooth.
//!
//! Handlers live in the server crate; this crate holds what they share:
//!
//! - [`AppError`]: JSON error bodies and the [`ServiceError`](ticketbooth_core::ServiceError)
//!   to HTTP status mapping
//! - [`correlation_id_layer`]: per-request correlation ids and request metrics
//! - [`BearerToken`] and [`CorrelationId`] extractors, plus [`ApiJson`],
//!   [`ApiQuery`] and [`ApiPath`] whose rejections are [`AppError`]s

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ApiJson, ApiPath, ApiQuery, BearerToken, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type for handlers.
pub type WebResult<T> = Result<T, AppError>;
