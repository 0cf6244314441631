use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, query_builder::QueryBuilder};
use thiserror::Error;

use crate::{
    events::lifecycle::EventStatus,
    models::{Event, EventFilter, NewEvent},
};

/// RepositoryError
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event not found")]
    NotFound,
    #[error("duplicate entry")]
    Duplicate,
    /// The stored version moved on since the caller read the event.
    #[error("event was modified concurrently")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate,
            _ => RepositoryError::Database(err),
        }
    }
}

/// EventRepository
///
/// Persistence contract for events. Handlers and the service talk to this trait only,
/// so the Postgres store and the in-memory store are interchangeable.
///
/// Every write is a compare-and-set on `version`: `replace` and `delete` succeed only
/// if the stored version still equals the one the caller read, and fail with
/// `RepositoryError::Conflict` otherwise. That gives at-most-one-writer semantics per
/// event without holding a lock across the read-check-write sequence.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Inserts a new event in `Planning` with zero participants and version 1.
    async fn insert(&self, event: NewEvent) -> Result<Event, RepositoryError>;

    async fn find(&self, id: i64) -> Result<Option<Event>, RepositoryError>;

    /// Events matching the filter, ordered by date ascending.
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, RepositoryError>;

    async fn list_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>, RepositoryError>;

    /// Persists the mutable fields of `event` if the stored version equals
    /// `event.version`, returning the stored row with its version bumped.
    /// `organizer_id`, `current_participants` and `created_at` are never written.
    async fn replace(&self, event: &Event) -> Result<Event, RepositoryError>;

    /// Deletes the event if the stored version equals `expected_version`.
    async fn delete(&self, id: i64, expected_version: i64) -> Result<(), RepositoryError>;
}

/// EventRepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type EventRepositoryState = Arc<dyn EventRepository>;

// --- Postgres ---

/// EventRow
///
/// Raw database row. `status` is stored as text and parsed into `EventStatus`.
#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    organizer_id: i64,
    title: String,
    description: Option<String>,
    location: Option<String>,
    date: DateTime<Utc>,
    max_participants: i32,
    current_participants: i32,
    category: String,
    status: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = RepositoryError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(RepositoryError::Corrupt)?;
        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            title: row.title,
            description: row.description,
            location: row.location,
            date: row.date,
            max_participants: row.max_participants,
            current_participants: row.current_participants,
            category: row.category,
            status,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<Event>, RepositoryError> {
    rows.into_iter().map(Event::try_from).collect()
}

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, date, \
    max_participants, current_participants, category, status, version, created_at, updated_at";

/// PostgresEventRepository
///
/// The `EventRepository` backed by the `events` table (see `migrations/`).
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: NewEvent) -> Result<Event, RepositoryError> {
        let sql = format!(
            "INSERT INTO events (organizer_id, title, description, location, date, \
             max_participants, category, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.organizer_id)
            .bind(event.title)
            .bind(event.description)
            .bind(event.location)
            .bind(event.date)
            .bind(event.max_participants)
            .bind(event.category)
            .bind(EventStatus::Planning.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find(&self, id: i64) -> Result<Option<Event>, RepositoryError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    /// Builds the filter with QueryBuilder so every value is bound, never interpolated.
    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, RepositoryError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category.clone());
        }
        builder.push(" ORDER BY date ASC");

        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    async fn list_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>, RepositoryError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY date ASC"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(organizer_id)
            .fetch_all(&self.pool)
            .await?;
        into_events(rows)
    }

    /// The `version = $2` predicate is the compare-and-set; zero rows back means either
    /// a concurrent writer won or the event is gone.
    async fn replace(&self, event: &Event) -> Result<Event, RepositoryError> {
        let sql = format!(
            "UPDATE events SET title = $3, description = $4, location = $5, date = $6, \
             max_participants = $7, category = $8, status = $9, updated_at = $10, \
             version = version + 1 \
             WHERE id = $1 AND version = $2 RETURNING {EVENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event.id)
            .bind(event.version)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.location)
            .bind(event.date)
            .bind(event.max_participants)
            .bind(&event.category)
            .bind(event.status.as_str())
            .bind(event.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missing_or_conflict(event.id).await),
        }
    }

    async fn delete(&self, id: i64, expected_version: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(())
        } else {
            Err(self.missing_or_conflict(id).await)
        }
    }
}

impl PostgresEventRepository {
    async fn missing_or_conflict(&self, id: i64) -> RepositoryError {
        match self.find(id).await {
            Ok(Some(_)) => RepositoryError::Conflict,
            Ok(None) => RepositoryError::NotFound,
            Err(e) => e,
        }
    }
}

// --- In-Memory ---

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    events: BTreeMap<i64, Event>,
}

/// InMemoryEventRepository
///
/// A process-local `EventRepository` used for tests and for running the event service
/// locally without Postgres. The mutex is only ever held for the duration of a map
/// operation, never across an await point.
#[derive(Default)]
pub struct InMemoryEventRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an event exactly as given (id, status, participants and version included).
    /// Lets callers set up states that are only reachable through other services, such
    /// as a non-zero participant count.
    pub fn seed(&self, event: Event) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(event.id);
        state.events.insert(event.id, event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn by_date(events: impl Iterator<Item = Event>) -> Vec<Event> {
    let mut events: Vec<Event> = events.collect();
    events.sort_by_key(|event| (event.date, event.id));
    events
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, new: NewEvent) -> Result<Event, RepositoryError> {
        let mut state = self.lock();
        state.next_id += 1;
        let now = Utc::now();
        let event = Event {
            id: state.next_id,
            organizer_id: new.organizer_id,
            title: new.title,
            description: new.description,
            location: new.location,
            date: new.date,
            max_participants: new.max_participants,
            current_participants: 0,
            category: new.category,
            status: EventStatus::Planning,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find(&self, id: i64) -> Result<Option<Event>, RepositoryError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, RepositoryError> {
        let state = self.lock();
        Ok(by_date(
            state
                .events
                .values()
                .filter(|event| filter.status.is_none_or(|status| event.status == status))
                .filter(|event| {
                    filter
                        .category
                        .as_ref()
                        .is_none_or(|category| &event.category == category)
                })
                .cloned(),
        ))
    }

    async fn list_by_organizer(&self, organizer_id: i64) -> Result<Vec<Event>, RepositoryError> {
        let state = self.lock();
        Ok(by_date(
            state
                .events
                .values()
                .filter(|event| event.organizer_id == organizer_id)
                .cloned(),
        ))
    }

    async fn replace(&self, event: &Event) -> Result<Event, RepositoryError> {
        let mut state = self.lock();
        let stored = state
            .events
            .get_mut(&event.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.version != event.version {
            return Err(RepositoryError::Conflict);
        }

        stored.title = event.title.clone();
        stored.description = event.description.clone();
        stored.location = event.location.clone();
        stored.date = event.date;
        stored.max_participants = event.max_participants;
        stored.category = event.category.clone();
        stored.status = event.status;
        stored.updated_at = event.updated_at;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64, expected_version: i64) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        match state.events.get(&id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.version != expected_version => Err(RepositoryError::Conflict),
            Some(_) => {
                state.events.remove(&id);
                Ok(())
            }
        }
    }
}
