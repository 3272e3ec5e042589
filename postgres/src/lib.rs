//! `PostgreSQL` storage backend for Ticketbooth.
//!
//! [`PostgresStore`] implements every repository trait from
//! `ticketbooth-core` on top of a sqlx connection pool:
//!
//! - Users, events and bookings as plain tables (see `migrations/`)
//! - Each [`LedgerEntry`](ticketbooth_core::store::LedgerEntry) runs in its
//!   own transaction, locking the booking row before the event row
//! - A `CHECK` constraint backs up `0 <= available_tickets <= total_tickets`
//!
//! # Example
//!
//! ```no_run
//! use ticketbooth_postgres::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgres://localhost/ticketbooth", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookings;
mod events;
mod ledger;
mod rows;
mod users;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use ticketbooth_core::store::{StoreError, StoreResult};

/// `PostgreSQL` implementation of every Ticketbooth repository
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Connection pool sizing and timeouts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
    /// Idle connections older than this are closed
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PostgresStore {
    /// Connect a pool of at most `max_connections`
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        Self::connect_with(
            database_url,
            &PoolSettings {
                max_connections,
                ..PoolSettings::default()
            },
        )
        .await
    }

    /// Connect a pool with explicit settings
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if the database cannot be reached.
    pub async fn connect_with(database_url: &str, settings: &PoolSettings) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(settings.idle_timeout)
            .connect(database_url)
            .await
            .map_err(database)?;
        tracing::info!(
            max_connections = settings.max_connections,
            min_connections = settings.min_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

pub(crate) fn database(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}
