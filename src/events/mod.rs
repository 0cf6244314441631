//! The event service: the backend that owns the event lifecycle.
//!
//! It sits behind the gateway and receives requests with the `/api/v1/events` prefix
//! already rewritten to `/api/v1`. The caller's identity arrives in forwarding headers
//! (see [`crate::context`]); the role gate has already been applied at the edge, so
//! this service enforces ownership and transition legality only.

pub mod handlers;
pub mod lifecycle;
pub mod repository;
pub mod service;
pub mod validation;

use axum::{
    Json, Router,
    routing::{get, patch},
};
use chrono::Utc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{error::ApiError, models, response, with_observability};
use repository::EventRepositoryState;
use service::EventService;

/// ApiDoc
///
/// OpenAPI document for the event service, served at `/api-docs/openapi.json` with a
/// Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_events, handlers::get_event, handlers::get_my_events,
        handlers::create_event, handlers::update_event, handlers::delete_event,
        handlers::change_event_status
    ),
    components(
        schemas(
            models::Event, models::CreateEventRequest, models::UpdateEventRequest,
            models::UpdateStatusRequest, lifecycle::EventStatus, handlers::EventData,
            handlers::EventsData, response::ErrorBody, response::FieldError,
        )
    ),
    tags(
        (name = "events", description = "Event lifecycle API")
    )
)]
struct ApiDoc;

/// create_event_router
///
/// Assembles the event service. Routes are declared at their rewritten paths;
/// `/api/v1/organizer/me` is a literal route and wins over `/api/v1/{id}` regardless of
/// declaration order.
pub fn create_event_router(repo: EventRepositoryState) -> Router {
    let service = EventService::new(repo);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({
                    "success": true,
                    "message": "Event Service is healthy",
                    "timestamp": Utc::now().to_rfc3339(),
                }))
            }),
        )
        .route(
            "/api/v1",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/api/v1/organizer/me", get(handlers::get_my_events))
        .route(
            "/api/v1/{id}",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route("/api/v1/{id}/status", patch(handlers::change_event_status))
        .fallback(|| async { ApiError::RouteNotFound })
        .with_state(service);

    with_observability(router)
}
