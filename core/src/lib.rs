//! # Ticketbooth Core
//!
//! Domain model and services for an event-ticketing backend whose central
//! concern is reconciling bookings, payments and ticket inventory.
//!
//! ## Lifecycle
//!
//! ```text
//! create_booking ──► pending ──confirm (capture ok)──► completed
//!                       │                                  │
//!                       └─ payment window passes ─► failed  └─ delete ─► tickets refunded
//! issue (admin) ───────────────────────────────────► completed
//! ```
//!
//! - A regular booking takes no inventory while pending.
//! - Inventory is committed exactly once, when a payment is reconciled or a
//!   complimentary booking is issued, and returned when a completed booking
//!   is deleted.
//! - `0 ≤ available ≤ total` holds for every event after every operation.
//!
//! ## Layout
//!
//! - [`types`]: identifiers, money, events, bookings, users
//! - [`ledger`]: inventory arithmetic and the [`ledger::InventoryLedger`]
//! - [`store`]: repository traits and atomic [`store::LedgerEntry`] writes
//! - [`gateway`], [`notify`]: external collaborator contracts
//! - [`services`]: reservation, payment reconciliation, complimentary
//!   issuance, bookings, events, accounts, pending-booking expiry

pub mod environment;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod services;
pub mod store;
pub mod templates;
pub mod types;

pub use error::{FieldError, ServiceError, ServiceResult};
