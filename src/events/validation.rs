use chrono::{DateTime, Utc};

use crate::{
    events::lifecycle::EventStatus,
    models::{CreateEventRequest, EventChanges, NewEvent, UpdateEventRequest, UpdateStatusRequest},
    response::FieldError,
};

// Field limits for event payloads.
const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;
const LOCATION_MAX: usize = 255;
const CATEGORY_MAX: usize = 50;
const PARTICIPANTS_MIN: i64 = 1;
const PARTICIPANTS_MAX: i64 = 10_000;

/// Collects field errors in declaration order.
#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(self.0)
        }
    }
}

fn check_title(errors: &mut Errors, title: &str) {
    let len = title.chars().count();
    if len < TITLE_MIN {
        errors.push("title", "Title must be at least 3 characters long");
    } else if len > TITLE_MAX {
        errors.push("title", "Title must not exceed 200 characters");
    }
}

fn check_max_len(errors: &mut Errors, field: &str, value: &str, max: usize, message: &str) {
    if value.chars().count() > max {
        errors.push(field, message);
    }
}

fn check_date(errors: &mut Errors, date: DateTime<Utc>, now: DateTime<Utc>) {
    if date <= now {
        errors.push("date", "Event date must be in the future");
    }
}

fn check_participants(errors: &mut Errors, max: i64) {
    if max < PARTICIPANTS_MIN {
        errors.push("maxParticipants", "Maximum participants must be at least 1");
    } else if max > PARTICIPANTS_MAX {
        errors.push("maxParticipants", "Maximum participants cannot exceed 10000");
    }
}

/// validate_create
///
/// Checks a creation payload and binds it to its organizer. All failures are reported
/// together, in field order.
pub fn validate_create(
    req: CreateEventRequest,
    organizer_id: i64,
    now: DateTime<Utc>,
) -> Result<NewEvent, Vec<FieldError>> {
    let mut errors = Errors::default();

    match &req.title {
        Some(title) => check_title(&mut errors, title),
        None => errors.push("title", "Title is required"),
    }
    if let Some(description) = &req.description {
        check_max_len(&mut errors, "description", description, DESCRIPTION_MAX, "Description must not exceed 1000 characters");
    }
    match req.date {
        Some(date) => check_date(&mut errors, date, now),
        None => errors.push("date", "Event date is required"),
    }
    match &req.location {
        Some(location) => check_max_len(&mut errors, "location", location, LOCATION_MAX, "Location must not exceed 255 characters"),
        None => errors.push("location", "Location is required"),
    }
    match req.max_participants {
        Some(max) => check_participants(&mut errors, max),
        None => errors.push("maxParticipants", "Maximum participants is required"),
    }
    match &req.category {
        Some(category) => check_max_len(&mut errors, "category", category, CATEGORY_MAX, "Category must not exceed 50 characters"),
        None => errors.push("category", "Category is required"),
    }

    errors.finish(|| NewEvent {
        organizer_id,
        title: req.title.unwrap_or_default(),
        description: req.description,
        location: req.location,
        date: req.date.unwrap_or(now),
        max_participants: req.max_participants.unwrap_or(PARTICIPANTS_MIN) as i32,
        category: req.category.unwrap_or_default(),
    })
}

/// validate_update
///
/// Same rules as creation, but every field is optional.
pub fn validate_update(
    req: UpdateEventRequest,
    now: DateTime<Utc>,
) -> Result<EventChanges, Vec<FieldError>> {
    let mut errors = Errors::default();

    if let Some(title) = &req.title {
        check_title(&mut errors, title);
    }
    if let Some(description) = &req.description {
        check_max_len(&mut errors, "description", description, DESCRIPTION_MAX, "Description must not exceed 1000 characters");
    }
    if let Some(date) = req.date {
        check_date(&mut errors, date, now);
    }
    if let Some(location) = &req.location {
        check_max_len(&mut errors, "location", location, LOCATION_MAX, "Location must not exceed 255 characters");
    }
    if let Some(max) = req.max_participants {
        check_participants(&mut errors, max);
    }
    if let Some(category) = &req.category {
        check_max_len(&mut errors, "category", category, CATEGORY_MAX, "Category must not exceed 50 characters");
    }

    errors.finish(|| EventChanges {
        title: req.title,
        description: req.description,
        date: req.date,
        location: req.location,
        max_participants: req.max_participants.map(|max| max as i32),
        category: req.category,
    })
}

/// validate_status
///
/// The body of a status change must name one of the five lifecycle states.
pub fn validate_status(req: UpdateStatusRequest) -> Result<EventStatus, Vec<FieldError>> {
    match req.status {
        None => Err(vec![FieldError::new("status", "Status is required")]),
        Some(raw) => raw
            .parse()
            .map_err(|_| vec![FieldError::new("status", "Invalid event status")]),
    }
}
