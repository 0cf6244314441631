//! Event lifecycle state machine.
//!
//! ```text
//! Planning ──▶ Published ──▶ Running ──▶ Completed
//!    │             │
//!    └─────────────┴──────▶ Canceled
//! ```
//!
//! `Completed` and `Canceled` are terminal. A running event cannot be canceled.
//!
//! Every check here is a pure function of the event snapshot and the requester. The
//! event service pairs them with a compare-and-set write so a decision made on a stale
//! snapshot never lands.

use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{Event, Identity};

/// EventStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EventStatus {
    Planning,
    Published,
    Running,
    Completed,
    Canceled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 5] = [
        EventStatus::Planning,
        EventStatus::Published,
        EventStatus::Running,
        EventStatus::Completed,
        EventStatus::Canceled,
    ];

    /// The transition table: every status reachable in one step from `self`.
    pub fn next_states(&self) -> &'static [EventStatus] {
        match self {
            EventStatus::Planning => &[EventStatus::Published, EventStatus::Canceled],
            EventStatus::Published => &[EventStatus::Running, EventStatus::Canceled],
            EventStatus::Running => &[EventStatus::Completed],
            EventStatus::Completed | EventStatus::Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        self.next_states().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Whether descriptive fields (title, date, ...) may still be edited.
    /// Canceled events stay editable; started or finished ones do not.
    pub fn allows_edits(&self) -> bool {
        !matches!(self, EventStatus::Running | EventStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Planning => "Planning",
            EventStatus::Published => "Published",
            EventStatus::Running => "Running",
            EventStatus::Completed => "Completed",
            EventStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown event status: {s}"))
    }
}

/// LifecycleError
///
/// The fine-grained checks owned by the resource: possession and transition legality.
/// The coarse role gate lives in the gateway's access policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Only the organizer can {action}")]
    NotOwner { action: &'static str },
    #[error("Invalid state transition from {from} to {to}")]
    IllegalTransition { from: EventStatus, to: EventStatus },
    #[error("{reason}")]
    InvalidState {
        status: EventStatus,
        reason: &'static str,
    },
    #[error("Cannot delete event with {count} registered participants")]
    HasParticipants { count: i32 },
}

fn ensure_owner(event: &Event, requester: &Identity, action: &'static str) -> Result<(), LifecycleError> {
    if event.organizer_id != requester.id {
        return Err(LifecycleError::NotOwner { action });
    }
    Ok(())
}

/// transition
///
/// Moves `event` to `target` if the requester owns it and the transition table has the
/// edge. Only `status` and `updated_at` change.
pub fn transition(
    mut event: Event,
    requester: &Identity,
    target: EventStatus,
) -> Result<Event, LifecycleError> {
    ensure_owner(&event, requester, "change event status")?;

    if !event.status.can_transition_to(target) {
        return Err(LifecycleError::IllegalTransition {
            from: event.status,
            to: target,
        });
    }

    event.status = target;
    event.updated_at = Utc::now();
    Ok(event)
}

/// ensure_editable
///
/// Gate for non-status updates: owner only, and not once the event has started.
pub fn ensure_editable(event: &Event, requester: &Identity) -> Result<(), LifecycleError> {
    ensure_owner(event, requester, "update this event")?;

    if !event.status.allows_edits() {
        return Err(LifecycleError::InvalidState {
            status: event.status,
            reason: "Cannot update event that has started or completed",
        });
    }
    Ok(())
}

/// ensure_deletable
///
/// Gate for deletion. Ownership, an empty roster, and `Planning` status are independent
/// conditions that must all hold. Participants are checked before status, so an event
/// with enrollments always reports `HasParticipants` whatever state it is in.
pub fn ensure_deletable(event: &Event, requester: &Identity) -> Result<(), LifecycleError> {
    ensure_owner(event, requester, "delete this event")?;

    if event.current_participants > 0 {
        return Err(LifecycleError::HasParticipants {
            count: event.current_participants,
        });
    }

    if event.status != EventStatus::Planning {
        return Err(LifecycleError::InvalidState {
            status: event.status,
            reason: "Can only delete events in Planning status",
        });
    }
    Ok(())
}
