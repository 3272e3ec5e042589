use crate::{PostgresStore, database, rows};
use async_trait::async_trait;
use ticketbooth_core::store::{EventDeletion, EventRepository, StoreResult};
use ticketbooth_core::types::{Event, EventChanges, EventDetails, EventId, EventQuery, Page};
use uuid::Uuid;

/// Shared filter of the listing and its count. `$1` is the category, `$2`
/// the search text; either may be NULL.
const LISTING_FILTER: &str = r"
    WHERE ($1::text IS NULL OR category = $1)
      AND ($2::text IS NULL
           OR strpos(lower(title), lower($2)) > 0
           OR strpos(lower(description), lower($2)) > 0
           OR strpos(lower(venue), lower($2)) > 0)
";

#[async_trait]
impl EventRepository for PostgresStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO events (
                id, title, description, category, date, time, venue, location,
                price_cents, total_tickets, available_tickets, image, created_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(*event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.venue)
        .bind(&event.location)
        .bind(rows::cents(event.price)?)
        .bind(i64::from(event.total_tickets))
        .bind(i64::from(event.available_tickets))
        .bind(&event.image)
        .bind(*event.created_by.as_uuid())
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(database)?;
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        let query = format!("SELECT {} FROM events WHERE id = $1", rows::EVENT_COLUMNS);
        sqlx::query(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::event)
            .transpose()
    }

    async fn find_event_details(&self, id: EventId) -> StoreResult<Option<EventDetails>> {
        let Some(event) = self.find_event(id).await? else {
            return Ok(None);
        };
        Ok(self.event_details(vec![event]).await?.pop())
    }

    async fn find_event_by_title(&self, title: &str) -> StoreResult<Option<Event>> {
        let query = format!(
            "SELECT {} FROM events WHERE title = $1 ORDER BY created_at LIMIT 1",
            rows::EVENT_COLUMNS
        );
        sqlx::query(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?
            .as_ref()
            .map(rows::event)
            .transpose()
    }

    async fn list_events(&self, query: &EventQuery) -> StoreResult<Page<EventDetails>> {
        let category = query.category.map(|c| c.as_str());
        let search = query.search.as_deref();

        let count = format!("SELECT COUNT(*) AS total FROM events {LISTING_FILTER}");
        let total = sqlx::query(&count)
            .bind(category)
            .bind(search)
            .fetch_one(&self.pool)
            .await
            .map_err(database)
            .and_then(|row| rows::total(&row))?;

        let select = format!(
            "SELECT {} FROM events {LISTING_FILTER} ORDER BY date, created_at LIMIT $3 OFFSET $4",
            rows::EVENT_COLUMNS
        );
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        let events = sqlx::query(&select)
            .bind(category)
            .bind(search)
            .bind(i64::from(query.limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(database)?
            .iter()
            .map(rows::event)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page {
            items: self.event_details(events).await?,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    async fn update_event(&self, id: EventId, changes: &EventChanges) -> StoreResult<Option<Event>> {
        let mut tx = self.pool.begin().await.map_err(database)?;

        let query = format!("SELECT {} FROM events WHERE id = $1 FOR UPDATE", rows::EVENT_COLUMNS);
        let Some(row) = sqlx::query(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(database)?
        else {
            return Ok(None);
        };
        let mut event = rows::event(&row)?;
        changes.apply_to(&mut event);

        sqlx::query(
            r"
            UPDATE events
            SET title = $2, description = $3, category = $4, date = $5, time = $6,
                venue = $7, location = $8, price_cents = $9, image = $10
            WHERE id = $1
            ",
        )
        .bind(*event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.venue)
        .bind(&event.location)
        .bind(rows::cents(event.price)?)
        .bind(&event.image)
        .execute(&mut *tx)
        .await
        .map_err(database)?;

        tx.commit().await.map_err(database)?;
        Ok(Some(event))
    }

    async fn delete_event(&self, id: EventId) -> StoreResult<EventDeletion> {
        let mut tx = self.pool.begin().await.map_err(database)?;

        let exists = sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(*id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(database)?
            .is_some();
        if !exists {
            return Ok(EventDeletion::NotFound);
        }

        let referencing = sqlx::query("SELECT COUNT(*) AS total FROM bookings WHERE event_id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(database)
            .and_then(|row| rows::total(&row))?;
        if referencing > 0 {
            return Ok(EventDeletion::HasBookings(referencing));
        }

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(database)?;
        tx.commit().await.map_err(database)?;
        Ok(EventDeletion::Deleted)
    }
}

impl PostgresStore {
    /// Populate creators for a batch of events, preserving order
    async fn event_details(&self, events: Vec<Event>) -> StoreResult<Vec<EventDetails>> {
        let mut creator_ids: Vec<Uuid> = events.iter().map(|e| *e.created_by.as_uuid()).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators = self.user_summaries(creator_ids).await?;

        Ok(events
            .into_iter()
            .map(|event| EventDetails {
                creator: creators.get(&event.created_by).cloned(),
                event,
            })
            .collect())
    }

    /// Events by id
    pub(crate) async fn events_by_id(&self, ids: Vec<Uuid>) -> StoreResult<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {} FROM events WHERE id = ANY($1)", rows::EVENT_COLUMNS);
        sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(database)?
            .iter()
            .map(rows::event)
            .collect()
    }
}
