//! Fixture builders and a fully wired service harness.

use crate::clock::{FixedClock, test_clock};
use crate::gateway::ScriptedGateway;
use crate::memory::InMemoryStore;
use crate::notifier::RecordingNotifier;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticketbooth_auth::TokenSigner;
use ticketbooth_core::environment::Clock;
use ticketbooth_core::notify::Notifier;
use ticketbooth_core::services::{BookingPolicy, Repositories, Services};
use ticketbooth_core::store::{EventRepository, UserRepository};
use ticketbooth_core::types::{
    Actor, Booking, Category, DEFAULT_EVENT_IMAGE, Event, EventId, Money, Role, User, UserId,
};

/// Secret used by [`test_signer`]
pub const TEST_TOKEN_SECRET: &str = "ticketbooth-test-secret";
/// E-mail reserved for the administrator in harnessed services
pub const RESERVED_ADMIN_EMAIL: &str = "admin@ticketbooth.test";
/// Stand-in hash for fixture users that never log in
pub const FIXTURE_PASSWORD_HASH: &str = "$fixture$no-login";

/// Token signer with the test secret and a one-hour TTL
///
/// # Panics
///
/// Never: the secret and TTL are valid constants.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_signer() -> TokenSigner {
    TokenSigner::new(TEST_TOKEN_SECRET, Duration::hours(1)).expect("valid test signer")
}

/// A user record
#[must_use]
pub fn sample_user(email: &str, role: Role, now: DateTime<Utc>) -> User {
    User {
        id: UserId::new(),
        name: email.split('@').next().unwrap_or(email).to_owned(),
        email: email.to_lowercase(),
        password_hash: FIXTURE_PASSWORD_HASH.to_owned(),
        role,
        created_at: now,
    }
}

/// An event one month after `now`
#[must_use]
pub fn sample_event(created_by: UserId, total: u32, available: u32, price: Money, now: DateTime<Utc>) -> Event {
    Event {
        id: EventId::new(),
        title: format!("Sample Event {}", &EventId::new().to_string()[..8]),
        description: "An evening to remember".to_owned(),
        category: Category::Concert,
        date: now + Duration::days(30),
        time: "19:00".to_owned(),
        venue: "Grand Hall".to_owned(),
        location: "Springfield".to_owned(),
        price,
        total_tickets: total,
        available_tickets: available,
        image: DEFAULT_EVENT_IMAGE.to_owned(),
        created_by,
        created_at: now,
    }
}

/// Services wired to in-memory doubles
pub struct Harness {
    /// Backing store
    pub store: Arc<InMemoryStore>,
    /// Payment gateway double
    pub gateway: Arc<ScriptedGateway>,
    /// Notification recorder (unused when built with another notifier)
    pub notifier: Arc<RecordingNotifier>,
    /// Controllable time
    pub clock: Arc<FixedClock>,
    /// The services under test
    pub services: Services,
}

impl Harness {
    /// Harness recording notifications
    #[must_use]
    pub fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        Self::build(notifier.clone(), notifier)
    }

    /// Harness delivering notifications through `notifier`
    #[must_use]
    pub fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::build(Arc::new(RecordingNotifier::new()), notifier)
    }

    fn build(recorder: Arc<RecordingNotifier>, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(ScriptedGateway::new());
        let clock = Arc::new(test_clock());
        let services = Services::new(
            Repositories::from_store(store.clone()),
            gateway.clone(),
            notifier,
            clock.clone(),
            test_signer(),
            BookingPolicy {
                pending_ttl: Duration::minutes(30),
                reserved_admin_email: Some(RESERVED_ADMIN_EMAIL.to_owned()),
            },
        );
        Self {
            store,
            gateway,
            notifier: recorder,
            clock,
            services,
        }
    }

    /// Current harness time
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Insert a user and return it
    ///
    /// # Panics
    ///
    /// If the e-mail is already taken.
    #[allow(clippy::expect_used)]
    pub async fn user(&self, email: &str, role: Role) -> User {
        let user = sample_user(email, role, self.now());
        self.store.insert_user(&user).await.expect("fixture user inserts");
        user
    }

    /// Insert an administrator and act as them
    pub async fn admin(&self) -> Actor {
        let user = self.user(&format!("admin-{}@ticketbooth.test", UserId::new()), Role::Admin).await;
        Actor::new(user.id, user.role)
    }

    /// Insert a regular user and act as them
    pub async fn customer(&self, email: &str) -> Actor {
        let user = self.user(email, Role::User).await;
        Actor::new(user.id, user.role)
    }

    /// Insert an event with the given counters and a $25.00 ticket price
    ///
    /// # Panics
    ///
    /// If the store rejects the insert.
    #[allow(clippy::expect_used)]
    pub async fn event(&self, total: u32, available: u32) -> Event {
        let creator = sample_user(&format!("creator-{}@ticketbooth.test", UserId::new()), Role::Admin, self.now());
        self.store.insert_user(&creator).await.expect("fixture creator inserts");
        let event = sample_event(creator.id, total, available, Money::from_cents(2_500), self.now());
        self.store.insert_event(&event).await.expect("fixture event inserts");
        event
    }

    /// Create a pending booking through the reservation service
    ///
    /// # Panics
    ///
    /// If the reservation is refused.
    #[allow(clippy::expect_used)]
    pub async fn pending_booking(&self, actor: &Actor, event_id: EventId, tickets: u32) -> Booking {
        self.services
            .reservations
            .create_booking(actor, event_id, tickets)
            .await
            .expect("booking is accepted")
    }

    /// Create a pending booking and open its payment order
    ///
    /// # Panics
    ///
    /// If either step is refused.
    #[allow(clippy::expect_used)]
    pub async fn ordered_booking(&self, actor: &Actor, event_id: EventId, tickets: u32) -> (Booking, String) {
        let booking = self.pending_booking(actor, event_id, tickets).await;
        let created = self
            .services
            .payments
            .create_order(actor, booking.id)
            .await
            .expect("order is created");
        (created.booking, created.order.order_id)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
