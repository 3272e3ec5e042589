//! Deterministic time.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;
use ticketbooth_core::environment::Clock;

/// Fixed clock for deterministic tests.
///
/// Always returns the same time until explicitly advanced.
///
/// # Example
///
/// ```
/// use ticketbooth_testing::test_clock;
/// use ticketbooth_core::environment::Clock;
/// use chrono::Duration;
///
/// let clock = test_clock();
/// let before = clock.now();
/// assert_eq!(before, clock.now());
/// clock.advance(Duration::minutes(31));
/// assert_eq!(clock.now() - before, Duration::minutes(31));
/// ```
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: RwLock::new(time),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *time += by;
    }

    /// Jump to a specific time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner) = to;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}
