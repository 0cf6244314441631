use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, HeaderValue, request::Parts},
};

use crate::{error::ApiError, models::Identity};

// --- Forwarding Headers ---

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

const IDENTITY_HEADERS: [HeaderName; 3] = [USER_ID_HEADER, USER_EMAIL_HEADER, USER_ROLE_HEADER];

/// strip_identity
///
/// Removes any identity headers a client supplied itself. Runs on every forwarded
/// request, so a backend only ever sees identity headers written by `attach`.
pub fn strip_identity(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(name);
    }
}

/// attach
///
/// The Context Forwarder. With an identity, writes the id, email and role as three
/// opaque string headers; without one (public route), writes nothing at all.
///
/// An email that is not a valid header value drops the whole identity rather than
/// forwarding a partial one.
pub fn attach(headers: &mut HeaderMap, identity: Option<&Identity>) {
    strip_identity(headers);

    let Some(identity) = identity else {
        return;
    };

    let Ok(email) = HeaderValue::from_str(&identity.email) else {
        tracing::warn!(user_id = identity.id, "email not representable as a header, forwarding anonymously");
        return;
    };

    tracing::debug!(user_id = identity.id, role = %identity.role, "forwarding user context");

    headers.insert(USER_ID_HEADER, HeaderValue::from(identity.id));
    headers.insert(USER_EMAIL_HEADER, email);
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(identity.role.as_str()));
}

/// read
///
/// The receiving side: rebuilds the identity from forwarding headers. All three must be
/// present and well-formed, otherwise the caller is anonymous.
pub fn read(headers: &HeaderMap) -> Option<Identity> {
    let get = |name: &HeaderName| headers.get(name).and_then(|value| value.to_str().ok());

    let id = get(&USER_ID_HEADER)?.parse().ok()?;
    let email = get(&USER_EMAIL_HEADER)?.to_string();
    let role = get(&USER_ROLE_HEADER)?.parse().ok()?;

    Some(Identity { id, email, role })
}

/// ForwardedIdentity
///
/// Extractor used by backend handlers. The backend trusts the gateway's headers and
/// does not re-verify the bearer credential; the network between the two is private.
/// Anonymous callers are rejected with `AuthenticationRequired`.
#[derive(Debug, Clone)]
pub struct ForwardedIdentity(pub Identity);

impl<S> FromRequestParts<S> for ForwardedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        read(&parts.headers)
            .map(ForwardedIdentity)
            .ok_or(ApiError::AuthenticationRequired)
    }
}
