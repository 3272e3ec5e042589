//! Startup data: the administrator account and the sample catalogue.

use crate::config::AdminConfig;
use chrono::{DateTime, NaiveDate, Utc};
use ticketbooth_core::ServiceResult;
use ticketbooth_core::services::{AccountService, AdminBootstrap};
use ticketbooth_core::store::{EventRepository, StoreResult};
use ticketbooth_core::types::{Category, Event, EventId, Money, User};

/// Make sure the configured administrator exists.
///
/// Returns `None` when no `ADMIN_EMAIL` is configured.
///
/// # Errors
///
/// `ValidationFailed` for a malformed e-mail, or when the account has to be
/// created and no `ADMIN_PASSWORD` is set; store failures.
pub async fn ensure_admin(accounts: &AccountService, config: &AdminConfig) -> ServiceResult<Option<User>> {
    let Some(email) = config.email.clone() else {
        tracing::warn!("ADMIN_EMAIL not set; no administrator account will be ensured");
        return Ok(None);
    };
    let admin = accounts
        .ensure_admin(AdminBootstrap {
            email,
            name: config.name.clone(),
            password: config.password.clone(),
        })
        .await?;
    Ok(Some(admin))
}

struct SampleEvent {
    title: &'static str,
    label: &'static str,
    description: &'static str,
    date: (i32, u32, u32),
    time: &'static str,
    venue: &'static str,
    location: &'static str,
    price_units: u64,
    total: u32,
    available: u32,
    image: &'static str,
}

const SAMPLE_EVENTS: &[SampleEvent] = &[
    SampleEvent {
        title: "Food Fiesta Festival",
        label: "Festival",
        description: "A food festival featuring cuisines from around the world.",
        date: (2025, 12, 15),
        time: "11:00 AM",
        venue: "Central Park Grounds",
        location: "Mumbai, India",
        price_units: 10,
        total: 2000,
        available: 1320,
        image: "https://images.unsplash.com/photo-1521305916504-4a1121188589?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "City Marathon 2025",
        label: "Sports Event",
        description: "Annual marathon open to all fitness levels.",
        date: (2026, 2, 22),
        time: "06:00 AM",
        venue: "City Stadium",
        location: "Delhi, India",
        price_units: 25,
        total: 3000,
        available: 2180,
        image: "https://images.unsplash.com/photo-1520975918313-6c2c1c6e7c52?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "Art & Culture Expo",
        label: "Exhibition",
        description: "A showcase of modern and traditional artwork.",
        date: (2026, 3, 2),
        time: "10:30 AM",
        venue: "National Art Gallery",
        location: "Kolkata, India",
        price_units: 15,
        total: 600,
        available: 420,
        image: "https://images.unsplash.com/photo-1529107386315-e1a2ed48a620?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "Global Business Webinar",
        label: "Webinar",
        description: "Online business strategies webinar hosted by experts.",
        date: (2025, 12, 18),
        time: "04:00 PM",
        venue: "Online (Zoom)",
        location: "Virtual",
        price_units: 20,
        total: 1000,
        available: 750,
        image: "https://images.unsplash.com/photo-1587614382346-4ec72b3a2b06?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "Corporate Product Launch",
        label: "Corporate Event",
        description: "Launch of a new tech product with live demonstrations.",
        date: (2026, 1, 10),
        time: "02:00 PM",
        venue: "Skyline Convention Center",
        location: "Pune, India",
        price_units: 0,
        total: 400,
        available: 270,
        image: "https://images.unsplash.com/photo-1556761175-5973dc0f32e7?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "Charity Fundraising Gala",
        label: "Charity Event",
        description: "A charity dinner to raise funds for community welfare.",
        date: (2025, 12, 28),
        time: "08:00 PM",
        venue: "Royal Banquet Hall",
        location: "Hyderabad, India",
        price_units: 75,
        total: 250,
        available: 130,
        image: "https://images.unsplash.com/photo-1524233620809-1c7a1a71a2c9?auto=format&fit=crop&w=1200&q=80",
    },
    SampleEvent {
        title: "Wedding & Celebration Expo",
        label: "Social Event",
        description: "An expo showcasing wedding planners, decorators, and celebration vendors.",
        date: (2026, 2, 14),
        time: "12:00 PM",
        venue: "Grand Palace Exhibition Center",
        location: "Ahmedabad, India",
        price_units: 12,
        total: 1000,
        available: 690,
        image: "https://images.unsplash.com/photo-1521302080334-4bebac27605e?auto=format&fit=crop&w=1200&q=80",
    },
];

/// Map a free-form label onto the fixed categories
fn category_for(label: &str) -> Category {
    let label = label.to_lowercase();
    if label.contains("sport") || label.contains("marathon") {
        Category::Sports
    } else if ["business", "webinar", "corporate"].iter().any(|word| label.contains(word)) {
        Category::Conference
    } else {
        Category::Other
    }
}

impl SampleEvent {
    fn to_event(&self, admin: &User, now: DateTime<Utc>) -> Option<Event> {
        let (year, month, day) = self.date;
        let date = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?.and_utc();
        Some(Event {
            id: EventId::new(),
            title: self.title.to_owned(),
            description: format!("{} (Category: {})", self.description, self.label),
            category: category_for(self.label),
            date,
            time: self.time.to_owned(),
            venue: self.venue.to_owned(),
            location: self.location.to_owned(),
            price: Money::from_cents(self.price_units * 100),
            total_tickets: self.total,
            available_tickets: self.available,
            image: self.image.to_owned(),
            created_by: admin.id,
            created_at: now,
        })
    }
}

/// Insert the sample catalogue, skipping titles that already exist.
///
/// Events go straight to the repository, so nobody is notified.
///
/// # Errors
///
/// Store failures.
pub async fn seed_sample_events(events: &dyn EventRepository, admin: &User, now: DateTime<Utc>) -> StoreResult<usize> {
    let mut inserted = 0;
    for sample in SAMPLE_EVENTS {
        if events.find_event_by_title(sample.title).await?.is_some() {
            tracing::debug!(title = sample.title, "Sample event already present");
            continue;
        }
        let Some(event) = sample.to_event(admin, now) else {
            tracing::warn!(title = sample.title, "Sample event has an invalid date; skipped");
            continue;
        };
        events.insert_event(&event).await?;
        inserted += 1;
    }
    tracing::info!(inserted, "Sample events seeded");
    Ok(inserted)
}
