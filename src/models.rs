use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::events::lifecycle::EventStatus;

// --- Identity ---

/// Role
///
/// The coarse RBAC field carried inside every credential. Serialized in upper case
/// (`ORGANIZER`, `PARTICIPANT`) both in JWT claims and in forwarded headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Organizer,
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "ORGANIZER",
            Role::Participant => "PARTICIPANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORGANIZER" => Ok(Role::Organizer),
            "PARTICIPANT" => Ok(Role::Participant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Identity
///
/// Verified caller attributes. Produced either by the gateway from a bearer credential
/// or by a backend from the gateway's forwarding headers. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

// --- Event Resource ---

/// Event
///
/// The managed resource whose `status` is governed by the lifecycle state machine.
/// `organizer_id` is fixed at creation. `version` increases on every write and backs
/// the compare-and-set that keeps concurrent mutations from overwriting each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub category: String,
    pub status: EventStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewEvent
///
/// A validated creation payload together with its owner, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    pub max_participants: i32,
    pub category: String,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateEventRequest
///
/// Input payload for `POST /api/v1/events`. Every field is optional at the serde level
/// so that missing fields surface as field-level validation errors instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_participants: Option<i64>,
    pub category: Option<String>,
}

/// UpdateEventRequest
///
/// Partial update payload for `PUT /api/v1/events/{id}`. Only provided fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// EventChanges
///
/// The validated form of `UpdateEventRequest`, applied by the repository.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_participants: Option<i32>,
    pub category: Option<String>,
}

impl EventChanges {
    /// Applies the provided fields onto an event in place.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(max) = self.max_participants {
            event.max_participants = max;
        }
        if let Some(category) = &self.category {
            event.category = category.clone();
        }
    }
}

/// UpdateStatusRequest
///
/// Body of `PATCH /api/v1/events/{id}/status`. The raw string is validated against the
/// five lifecycle states before it reaches the state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// EventFilter
///
/// Query parameters accepted by the event listing endpoint.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub category: Option<String>,
}
