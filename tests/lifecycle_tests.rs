use chrono::{Duration, Utc};
use mov_gateway::{
    events::lifecycle::{self, EventStatus, LifecycleError},
    models::{Event, Identity, Role},
};

fn organizer(id: i64) -> Identity {
    Identity {
        id,
        email: format!("org{id}@example.com"),
        role: Role::Organizer,
    }
}

fn event(status: EventStatus) -> Event {
    let created = Utc::now() - Duration::days(1);
    Event {
        id: 42,
        organizer_id: 1,
        title: "Rust Meetup".to_string(),
        description: Some("Monthly meetup".to_string()),
        location: Some("Limerick".to_string()),
        date: Utc::now() + Duration::days(30),
        max_participants: 50,
        current_participants: 0,
        category: "tech".to_string(),
        status,
        version: 3,
        created_at: created,
        updated_at: created,
    }
}

fn legal_edges() -> Vec<(EventStatus, EventStatus)> {
    use EventStatus::*;
    vec![
        (Planning, Published),
        (Planning, Canceled),
        (Published, Running),
        (Published, Canceled),
        (Running, Completed),
    ]
}

// --- Transition table ---

#[test]
fn test_transition_succeeds_exactly_on_table_edges() {
    let owner = organizer(1);
    let legal = legal_edges();

    for from in EventStatus::ALL {
        for to in EventStatus::ALL {
            let result = lifecycle::transition(event(from), &owner, to);
            if legal.contains(&(from, to)) {
                let updated = result.unwrap_or_else(|e| panic!("{from} -> {to} should pass: {e}"));
                assert_eq!(updated.status, to);
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    LifecycleError::IllegalTransition { from, to },
                    "{from} -> {to} should be illegal"
                );
            }
        }
    }
}

#[test]
fn test_table_shape() {
    for status in EventStatus::ALL {
        let terminal = matches!(status, EventStatus::Completed | EventStatus::Canceled);
        assert_eq!(status.is_terminal(), terminal);
        assert_eq!(status.next_states().is_empty(), terminal);
        // No self-loops.
        assert!(!status.can_transition_to(status));
    }
    // A running event cannot be canceled.
    assert!(!EventStatus::Running.can_transition_to(EventStatus::Canceled));
}

#[test]
fn test_transition_changes_only_status_and_timestamp() {
    let before = event(EventStatus::Planning);
    let after = lifecycle::transition(before.clone(), &organizer(1), EventStatus::Published).unwrap();

    assert!(after.updated_at > before.updated_at);
    assert_eq!(
        Event {
            status: before.status,
            updated_at: before.updated_at,
            ..after
        },
        before
    );
}

// --- Ownership ---

#[test]
fn test_non_owner_is_refused_before_legality() {
    let stranger = organizer(2);

    for from in EventStatus::ALL {
        for to in EventStatus::ALL {
            assert!(matches!(
                lifecycle::transition(event(from), &stranger, to),
                Err(LifecycleError::NotOwner { .. })
            ));
        }
        assert!(matches!(
            lifecycle::ensure_editable(&event(from), &stranger),
            Err(LifecycleError::NotOwner { .. })
        ));
        assert!(matches!(
            lifecycle::ensure_deletable(&event(from), &stranger),
            Err(LifecycleError::NotOwner { .. })
        ));
    }
}

#[test]
fn test_not_owner_message() {
    let err = lifecycle::transition(event(EventStatus::Planning), &organizer(9), EventStatus::Published)
        .unwrap_err();
    assert_eq!(err.to_string(), "Only the organizer can change event status");

    let err = lifecycle::ensure_editable(&event(EventStatus::Planning), &organizer(9)).unwrap_err();
    assert_eq!(err.to_string(), "Only the organizer can update this event");

    let err = lifecycle::ensure_deletable(&event(EventStatus::Planning), &organizer(9)).unwrap_err();
    assert_eq!(err.to_string(), "Only the organizer can delete this event");
}

// --- Update / delete rules ---

#[test]
fn test_edits_allowed_until_the_event_starts() {
    let owner = organizer(1);
    for status in EventStatus::ALL {
        let result = lifecycle::ensure_editable(&event(status), &owner);
        match status {
            EventStatus::Running | EventStatus::Completed => assert!(matches!(
                result,
                Err(LifecycleError::InvalidState { .. })
            )),
            _ => assert_eq!(result, Ok(())),
        }
    }
}

#[test]
fn test_delete_only_in_planning() {
    let owner = organizer(1);
    for status in EventStatus::ALL {
        let result = lifecycle::ensure_deletable(&event(status), &owner);
        if status == EventStatus::Planning {
            assert_eq!(result, Ok(()));
        } else {
            assert!(matches!(result, Err(LifecycleError::InvalidState { .. })));
        }
    }
}

#[test]
fn test_delete_with_participants_fails_regardless_of_status() {
    let owner = organizer(1);
    for status in EventStatus::ALL {
        let mut enrolled = event(status);
        enrolled.current_participants = 3;

        assert_eq!(
            lifecycle::ensure_deletable(&enrolled, &owner),
            Err(LifecycleError::HasParticipants { count: 3 })
        );
    }
}

// --- Scenario ---

#[test]
fn test_publish_then_return_to_planning_is_illegal() {
    let owner = organizer(1);

    let published = lifecycle::transition(event(EventStatus::Planning), &owner, EventStatus::Published)
        .unwrap();
    assert_eq!(published.status, EventStatus::Published);

    let err = lifecycle::transition(published, &owner, EventStatus::Planning).unwrap_err();
    assert_eq!(err.to_string(), "Invalid state transition from Published to Planning");
}

#[test]
fn test_status_parsing() {
    for status in EventStatus::ALL {
        assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
    }
    assert!("published".parse::<EventStatus>().is_err());
    assert!("Archived".parse::<EventStatus>().is_err());
}
