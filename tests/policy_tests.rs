use axum::http::{HeaderMap, HeaderValue};
use mov_gateway::{
    context::{self, USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER},
    gateway::policy::{AccessDenied, authorize},
    models::{Identity, Role},
};

fn identity(role: Role) -> Identity {
    Identity {
        id: 3,
        email: "someone@example.com".to_string(),
        role,
    }
}

// --- Access Policy ---

#[test]
fn test_unrestricted_route_admits_anyone() {
    assert_eq!(authorize(None, None), Ok(()));
    assert_eq!(authorize(Some(&identity(Role::Participant)), None), Ok(()));
}

#[test]
fn test_restricted_route_without_identity_requires_authentication() {
    assert_eq!(
        authorize(None, Some(&[Role::Organizer])),
        Err(AccessDenied::AuthenticationRequired)
    );
}

#[test]
fn test_every_role_outside_the_set_is_refused() {
    let allowed = [Role::Organizer];
    assert_eq!(authorize(Some(&identity(Role::Organizer)), Some(&allowed)), Ok(()));
    assert_eq!(
        authorize(Some(&identity(Role::Participant)), Some(&allowed)),
        Err(AccessDenied::InsufficientPermissions)
    );

    let both = [Role::Organizer, Role::Participant];
    assert_eq!(authorize(Some(&identity(Role::Participant)), Some(&both)), Ok(()));

    // An empty set admits nobody.
    assert_eq!(
        authorize(Some(&identity(Role::Organizer)), Some(&[])),
        Err(AccessDenied::InsufficientPermissions)
    );
}

// --- Context Forwarder ---

#[test]
fn test_attach_writes_three_headers() {
    let mut headers = HeaderMap::new();
    context::attach(&mut headers, Some(&identity(Role::Organizer)));

    assert_eq!(headers.get(USER_ID_HEADER).unwrap(), "3");
    assert_eq!(headers.get(USER_EMAIL_HEADER).unwrap(), "someone@example.com");
    assert_eq!(headers.get(USER_ROLE_HEADER).unwrap(), "ORGANIZER");
    assert_eq!(context::read(&headers), Some(identity(Role::Organizer)));
}

#[test]
fn test_anonymous_request_carries_no_identity_headers() {
    let mut headers = HeaderMap::new();
    // Client tries to impersonate someone on a public route.
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("1"));
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("ORGANIZER"));
    headers.insert("accept", HeaderValue::from_static("application/json"));

    context::attach(&mut headers, None);

    assert!(headers.get(USER_ID_HEADER).is_none());
    assert!(headers.get(USER_ROLE_HEADER).is_none());
    assert!(headers.get("accept").is_some());
    assert_eq!(context::read(&headers), None);
}

#[test]
fn test_attach_replaces_client_supplied_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("999"));
    headers.append(USER_ROLE_HEADER, HeaderValue::from_static("ORGANIZER"));

    context::attach(&mut headers, Some(&identity(Role::Participant)));

    assert_eq!(headers.get_all(USER_ID_HEADER).iter().count(), 1);
    assert_eq!(headers.get(USER_ID_HEADER).unwrap(), "3");
    assert_eq!(headers.get(USER_ROLE_HEADER).unwrap(), "PARTICIPANT");
}

#[test]
fn test_read_rejects_partial_or_malformed_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("3"));
    headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("a@example.com"));
    assert_eq!(context::read(&headers), None);

    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("ADMIN"));
    assert_eq!(context::read(&headers), None);

    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("PARTICIPANT"));
    headers.insert(USER_ID_HEADER, HeaderValue::from_static("three"));
    assert_eq!(context::read(&headers), None);
}
