use axum::{
    Json,
    extract::{
        FromRequestParts, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    context::ForwardedIdentity,
    error::ApiError,
    events::{service::EventService, validation},
    models::{CreateEventRequest, Event, EventFilter, UpdateEventRequest, UpdateStatusRequest},
    response::{ApiResponse, Success},
};

// --- Response Payloads ---

/// EventData
///
/// `data` payload for single-event responses: `{ "event": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventData {
    pub event: Event,
}

/// EventsData
///
/// `data` payload for listings: `{ "events": [ ... ] }`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventsData {
    pub events: Vec<Event>,
}

// --- Extractor helpers ---

/// EventId
///
/// The `{id}` path segment. A non-numeric id becomes a validation error in the
/// standard envelope instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct EventId(pub i64);

impl<S> FromRequestParts<S> for EventId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::invalid_field("id", "Event id must be an integer"))?;
        Ok(EventId(id))
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::invalid_field("body", &rejection.body_text()))
}

// --- Handlers ---

/// list_events
///
/// [Public Route] Lists events, optionally filtered by `status` and `category`,
/// ordered by date.
#[utoipa::path(
    get,
    path = "/api/v1",
    params(EventFilter),
    responses(
        (status = 200, description = "Events retrieved successfully", body = ApiResponse<EventsData>),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_events(
    State(service): State<EventService>,
    filter: Result<Query<EventFilter>, QueryRejection>,
) -> Result<Success<EventsData>, ApiError> {
    let Query(filter) =
        filter.map_err(|rejection| ApiError::invalid_field("query", &rejection.body_text()))?;
    let events = service.list(&filter).await?;
    Ok(ApiResponse::ok("Events retrieved successfully", EventsData { events }))
}

/// get_event
///
/// [Public Route] Retrieves a single event.
#[utoipa::path(
    get,
    path = "/api/v1/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event retrieved successfully", body = ApiResponse<EventData>),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(service): State<EventService>,
    EventId(id): EventId,
) -> Result<Success<EventData>, ApiError> {
    let event = service.get(id).await?;
    Ok(ApiResponse::ok("Event retrieved successfully", EventData { event }))
}

/// get_my_events
///
/// [Organizer Route] Lists the events owned by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/organizer/me",
    responses((status = 200, description = "Organizer events retrieved successfully", body = ApiResponse<EventsData>))
)]
pub async fn get_my_events(
    State(service): State<EventService>,
    ForwardedIdentity(identity): ForwardedIdentity,
) -> Result<Success<EventsData>, ApiError> {
    let events = service.list_for_organizer(&identity).await?;
    Ok(ApiResponse::ok(
        "Organizer events retrieved successfully",
        EventsData { events },
    ))
}

/// create_event
///
/// [Organizer Route] Creates an event in `Planning`. The organizer is always the
/// caller; any owner supplied in the body is ignored.
#[utoipa::path(
    post,
    path = "/api/v1",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created successfully", body = ApiResponse<EventData>),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_event(
    State(service): State<EventService>,
    ForwardedIdentity(identity): ForwardedIdentity,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Success<EventData>, ApiError> {
    let req = json_body(body)?;
    let event = service.create(req, &identity).await?;
    Ok(ApiResponse::created("Event created successfully", EventData { event }))
}

/// update_event
///
/// [Organizer Route] Edits descriptive fields. **Owner-Only**; refused once the event
/// is `Running` or `Completed`.
#[utoipa::path(
    put,
    path = "/api/v1/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated successfully", body = ApiResponse<EventData>),
        (status = 400, description = "Invalid state or validation error"),
        (status = 403, description = "Not the organizer"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn update_event(
    State(service): State<EventService>,
    ForwardedIdentity(identity): ForwardedIdentity,
    EventId(id): EventId,
    body: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Success<EventData>, ApiError> {
    let req = json_body(body)?;
    let event = service.update(id, req, &identity).await?;
    Ok(ApiResponse::ok("Event updated successfully", EventData { event }))
}

/// delete_event
///
/// [Organizer Route] Deletes an event. **Owner-Only**, `Planning` only, and only while
/// nobody is enrolled.
#[utoipa::path(
    delete,
    path = "/api/v1/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event deleted successfully"),
        (status = 400, description = "Invalid state or participants enrolled"),
        (status = 403, description = "Not the organizer"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    State(service): State<EventService>,
    ForwardedIdentity(identity): ForwardedIdentity,
    EventId(id): EventId,
) -> Result<Success<()>, ApiError> {
    service.delete(id, &identity).await?;
    Ok(ApiResponse::message("Event deleted successfully"))
}

/// change_event_status
///
/// [Organizer Route] Moves an event along the transition table.
#[utoipa::path(
    patch,
    path = "/api/v1/{id}/status",
    params(("id" = i64, Path, description = "Event ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Event status changed successfully", body = ApiResponse<EventData>),
        (status = 400, description = "Illegal transition or invalid status"),
        (status = 403, description = "Not the organizer"),
        (status = 409, description = "Concurrent modification")
    )
)]
pub async fn change_event_status(
    State(service): State<EventService>,
    ForwardedIdentity(identity): ForwardedIdentity,
    EventId(id): EventId,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Success<EventData>, ApiError> {
    let target = validation::validate_status(json_body(body)?).map_err(ApiError::Validation)?;
    let event = service.change_status(id, target, &identity).await?;
    Ok(ApiResponse::ok("Event status changed successfully", EventData { event }))
}
