//! Domain services.
//!
//! Each service holds the repositories and collaborators it needs behind
//! `Arc<dyn ...>`, so the same code runs against Postgres in production and the
//! in-memory store in tests. Authorization happens here, not in the stores.

pub mod accounts;
pub mod bookings;
pub mod complimentary;
pub mod events;
pub mod payment;
pub mod reservation;
pub mod sweeper;

pub use accounts::{AccountService, AdminBootstrap, Login, Registration, Session};
pub use bookings::{BookingChanges, BookingService, Cancellation};
pub use complimentary::{ComplimentaryRequest, ComplimentaryService};
pub use events::{EventService, NewEvent};
pub use payment::{ConfirmOutcome, Confirmation, OrderCreated, PaymentService};
pub use reservation::ReservationService;
pub use sweeper::PendingBookingSweeper;

use crate::environment::Clock;
use crate::gateway::PaymentGateway;
use crate::ledger::InventoryLedger;
use crate::notify::{Notifications, Notifier};
use crate::store::{BookingRepository, EventRepository, InventoryStore, Store, UserRepository};
use chrono::Duration;
use std::sync::Arc;
use ticketbooth_auth::TokenSigner;

/// Handles on every repository
#[derive(Clone)]
pub struct Repositories {
    /// Accounts
    pub users: Arc<dyn UserRepository>,
    /// Event catalogue
    pub events: Arc<dyn EventRepository>,
    /// Bookings
    pub bookings: Arc<dyn BookingRepository>,
    /// Inventory counters and ledger entries
    pub inventory: Arc<dyn InventoryStore>,
}

impl Repositories {
    /// Point every handle at one backend
    #[must_use]
    pub fn from_store<S: Store + 'static>(store: Arc<S>) -> Self {
        Self {
            users: store.clone(),
            events: store.clone(),
            bookings: store.clone(),
            inventory: store,
        }
    }
}

/// Tunables shared by the booking services
#[derive(Clone, Debug)]
pub struct BookingPolicy {
    /// How long a pending booking may wait for payment
    pub pending_ttl: Duration,
    /// E-mail that may not be registered through the public endpoint
    pub reserved_admin_email: Option<String>,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::minutes(30),
            reserved_admin_email: None,
        }
    }
}

/// Every service, wired to the same backend and collaborators
#[derive(Clone)]
pub struct Services {
    /// Registration, login, token checks, admin bootstrap
    pub accounts: AccountService,
    /// Event catalogue
    pub events: EventService,
    /// Pending booking creation
    pub reservations: ReservationService,
    /// Order creation, confirmation, reminders
    pub payments: PaymentService,
    /// Administrator-issued bookings
    pub complimentary: ComplimentaryService,
    /// Booking reads, edits and deletions
    pub bookings: BookingService,
    /// Expiry of abandoned pending bookings
    pub sweeper: PendingBookingSweeper,
    /// Inventory ledger
    pub ledger: InventoryLedger,
}

impl Services {
    /// Wire every service
    #[must_use]
    pub fn new(
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        signer: TokenSigner,
        policy: BookingPolicy,
    ) -> Self {
        let ledger = InventoryLedger::new(repos.inventory.clone());
        let notifications = Notifications::new(notifier);
        Self {
            accounts: AccountService::new(
                repos.users.clone(),
                signer,
                clock.clone(),
                policy.reserved_admin_email.clone(),
            ),
            events: EventService::new(repos.clone(), notifications.clone(), clock.clone()),
            reservations: ReservationService::new(
                repos.clone(),
                ledger.clone(),
                notifications.clone(),
                clock.clone(),
                policy.pending_ttl,
            ),
            payments: PaymentService::new(
                repos.clone(),
                ledger.clone(),
                gateway,
                notifications.clone(),
                clock.clone(),
            ),
            complimentary: ComplimentaryService::new(
                repos.clone(),
                ledger.clone(),
                notifications,
                clock.clone(),
            ),
            bookings: BookingService::new(repos.clone(), ledger.clone()),
            sweeper: PendingBookingSweeper::new(repos.bookings, clock),
            ledger,
        }
    }
}
