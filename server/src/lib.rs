//! # Ticketbooth Server
//!
//! The HTTP application around [`ticketbooth_core`]:
//!
//! - [`config`]: environment configuration
//! - [`state`], [`auth`], [`api`], [`routes`]: the `/api` surface
//! - [`payment_gateway`]: `PayPal` and mock gateways
//! - [`notifier`]: SMTP and console notifiers
//! - [`bootstrap`]: administrator account and sample catalogue
//! - [`metrics`]: Prometheus exporter

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

#[allow(missing_docs)]
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod metrics;
pub mod notifier;
pub mod payment_gateway;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
