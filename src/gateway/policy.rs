use thiserror::Error;

use crate::models::{Identity, Role};

/// AccessDenied
///
/// Refusals of the coarse role gate. Ownership is not decided here; the backend that
/// owns the resource checks it against resource state the gateway never sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("a role-restricted route was reached without an identity")]
    AuthenticationRequired,
    #[error("identity role is not allowed on this route")]
    InsufficientPermissions,
}

/// authorize
///
/// The Access Policy. `allowed == None` means the route has no role restriction and
/// admits anyone, identified or anonymous. Otherwise an identity must be present and its
/// role must be in the set.
pub fn authorize(identity: Option<&Identity>, allowed: Option<&[Role]>) -> Result<(), AccessDenied> {
    let Some(allowed) = allowed else {
        return Ok(());
    };

    let identity = identity.ok_or(AccessDenied::AuthenticationRequired)?;

    if !allowed.contains(&identity.role) {
        tracing::debug!(user_id = identity.id, role = %identity.role, "role not permitted on route");
        return Err(AccessDenied::InsufficientPermissions);
    }
    Ok(())
}
