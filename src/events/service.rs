use chrono::Utc;

use crate::{
    error::ApiError,
    events::{
        lifecycle::{self, EventStatus},
        repository::EventRepositoryState,
        validation,
    },
    models::{CreateEventRequest, Event, EventFilter, Identity, UpdateEventRequest},
};

/// EventService
///
/// Orchestrates the event use-cases: validation, the lifecycle checks, and the
/// compare-and-set write. Each mutation reads a snapshot, decides on it, and writes
/// back conditioned on the snapshot's version; a concurrent writer that got there first
/// turns the write into `ApiError::ConflictRetry`.
#[derive(Clone)]
pub struct EventService {
    repo: EventRepositoryState,
}

impl EventService {
    pub fn new(repo: EventRepositoryState) -> Self {
        Self { repo }
    }

    async fn load(&self, id: i64) -> Result<Event, ApiError> {
        self.repo
            .find(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
    }

    /// Creates an event in `Planning`, owned by the requester.
    pub async fn create(
        &self,
        req: CreateEventRequest,
        requester: &Identity,
    ) -> Result<Event, ApiError> {
        let new_event =
            validation::validate_create(req, requester.id, Utc::now()).map_err(ApiError::Validation)?;
        let event = self.repo.insert(new_event).await?;

        tracing::info!(event_id = event.id, organizer_id = requester.id, "event created");
        Ok(event)
    }

    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, ApiError> {
        Ok(self.repo.list(filter).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Event, ApiError> {
        self.load(id).await
    }

    pub async fn list_for_organizer(&self, organizer: &Identity) -> Result<Vec<Event>, ApiError> {
        Ok(self.repo.list_by_organizer(organizer.id).await?)
    }

    /// Edits descriptive fields. Owner only; refused once the event is running or done.
    pub async fn update(
        &self,
        id: i64,
        req: UpdateEventRequest,
        requester: &Identity,
    ) -> Result<Event, ApiError> {
        let now = Utc::now();
        let changes = validation::validate_update(req, now).map_err(ApiError::Validation)?;

        let mut event = self.load(id).await?;
        lifecycle::ensure_editable(&event, requester)?;

        changes.apply_to(&mut event);
        event.updated_at = now;
        let event = self.repo.replace(&event).await?;

        tracing::info!(event_id = id, "event updated");
        Ok(event)
    }

    /// Deletes an event that is owned by the requester, still in `Planning`, and empty.
    pub async fn delete(&self, id: i64, requester: &Identity) -> Result<(), ApiError> {
        let event = self.load(id).await?;
        lifecycle::ensure_deletable(&event, requester)?;

        self.repo.delete(id, event.version).await?;

        tracing::info!(event_id = id, "event deleted");
        Ok(())
    }

    /// Moves an event along the transition table.
    pub async fn change_status(
        &self,
        id: i64,
        target: EventStatus,
        requester: &Identity,
    ) -> Result<Event, ApiError> {
        let current = self.load(id).await?;
        let from = current.status;

        let next = lifecycle::transition(current, requester, target)?;
        let event = self.repo.replace(&next).await.inspect_err(|e| {
            tracing::warn!(event_id = id, %from, to = %target, error = %e, "status change not persisted");
        })?;

        tracing::info!(event_id = id, %from, to = %target, "event status changed");
        Ok(event)
    }
}
