use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use mov_gateway::{
    context::{USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER},
    create_event_router,
    events::repository::InMemoryEventRepository,
    models::Event,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (Router, Arc<InMemoryEventRepository>) {
    let repo = Arc::new(InMemoryEventRepository::new());
    (create_event_router(repo.clone()), repo)
}

/// Sends a request as the gateway would: identity in forwarding headers, if any.
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<(i64, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = user {
        builder = builder
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_EMAIL_HEADER, format!("user{id}@example.com"))
            .header(USER_ROLE_HEADER, role);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_event_body() -> Value {
    json!({
        "title": "Rust Meetup",
        "description": "Monthly meetup",
        "date": (Utc::now() + Duration::days(14)).to_rfc3339(),
        "location": "Limerick",
        "maxParticipants": 40,
        "category": "tech",
        "organizerId": 999,
    })
}

const ORGANIZER: Option<(i64, &str)> = Some((1, "ORGANIZER"));

async fn create(app: &Router) -> Event {
    let (status, body) = send(app, Method::POST, "/api/v1", ORGANIZER, Some(new_event_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body["data"]["event"].clone()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Event Service is healthy");
}

#[tokio::test]
async fn test_create_uses_forwarded_identity_as_organizer() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/api/v1", ORGANIZER, Some(new_event_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Event created successfully");
    assert_eq!(body["data"]["event"]["organizerId"], 1);
    assert_eq!(body["data"]["event"]["status"], "Planning");
    assert_eq!(body["data"]["event"]["currentParticipants"], 0);
}

#[tokio::test]
async fn test_mutations_require_forwarded_identity() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/api/v1", None, Some(new_event_body())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
    assert_eq!(body["errorCode"], "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_validation_errors_are_listed_per_field() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1",
        ORGANIZER,
        Some(json!({ "title": "ab", "maxParticipants": 20000 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors[0]["field"], "title");
    assert_eq!(errors[0]["message"], "Title must be at least 3 characters long");
    assert!(errors.iter().any(|e| e["field"] == "maxParticipants"));
}

#[tokio::test]
async fn test_public_reads() {
    let (app, _) = app();
    let event = create(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/v1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Events retrieved successfully");
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/{}", event.id);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event"]["title"], "Rust Meetup");

    let (status, body) = send(&app, Method::GET, "/api/v1?status=Published", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_ids_and_filters_are_validation_errors() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/api/v1/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "id");

    let (status, body) = send(&app, Method::GET, "/api/v1?status=Archived", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "query");

    let (status, body) = send(&app, Method::GET, "/api/v1/777", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Event not found");
    assert_eq!(body["errorCode"], "NOT_FOUND");
}

#[tokio::test]
async fn test_organizer_listing_is_not_mistaken_for_an_id() {
    let (app, _) = app();
    create(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/organizer/me", ORGANIZER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Organizer events retrieved successfully");
    assert_eq!(body["data"]["events"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/api/v1/organizer/me", Some((2, "ORGANIZER")), None).await;
    assert!(body["data"]["events"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_changes() {
    let (app, _) = app();
    let event = create(&app).await;
    let uri = format!("/api/v1/{}/status", event.id);

    let (status, body) = send(&app, Method::PATCH, &uri, ORGANIZER, Some(json!({ "status": "Published" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event status changed successfully");
    assert_eq!(body["data"]["event"]["status"], "Published");

    let (status, body) = send(&app, Method::PATCH, &uri, ORGANIZER, Some(json!({ "status": "Planning" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "INVALID_STATE_TRANSITION");
    assert_eq!(body["message"], "Invalid state transition from Published to Planning");

    let (status, body) = send(&app, Method::PATCH, &uri, ORGANIZER, Some(json!({ "status": "Done" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Invalid event status");

    let (status, body) = send(&app, Method::PATCH, &uri, ORGANIZER, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Status is required");

    let (status, body) = send(&app, Method::PATCH, &uri, Some((2, "ORGANIZER")), Some(json!({ "status": "Running" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "AUTHORIZATION_ERROR");
}

#[tokio::test]
async fn test_update_and_delete() {
    let (app, repo) = app();
    let event = create(&app).await;
    let uri = format!("/api/v1/{}", event.id);

    let (status, body) = send(&app, Method::PUT, &uri, ORGANIZER, Some(json!({ "location": "Galway" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event updated successfully");
    assert_eq!(body["data"]["event"]["location"], "Galway");
    assert_eq!(body["data"]["event"]["title"], "Rust Meetup");

    repo.seed(Event {
        current_participants: 3,
        ..event.clone()
    });
    let (status, body) = send(&app, Method::DELETE, &uri, ORGANIZER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "HAS_PARTICIPANTS");

    repo.seed(event.clone());
    let (status, body) = send(&app, Method::DELETE, &uri, ORGANIZER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event deleted successfully");
    assert!(body.get("data").is_none());

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_uses_failure_envelope() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/nowhere", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Route not found", "errorCode": "NOT_FOUND" }));
}
