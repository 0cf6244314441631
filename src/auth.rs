use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, header};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Identity, Role};

/// Claims
///
/// The payload carried inside every bearer credential. Field names match the tokens the
/// auth service has always issued (`userId`, `email`, `role`), plus the registered
/// `iat`/`exp` timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject: the numeric user id.
    pub user_id: i64,
    pub email: String,
    /// An unknown role string fails deserialization, which surfaces as `CredentialInvalid`.
    pub role: Role,
    /// Expiration Time (exp): seconds since the epoch after which the token is rejected.
    pub exp: u64,
    /// Issued At (iat).
    pub iat: u64,
}

/// AuthError
///
/// Failures of the Identity Verifier. Every variant except `Signing` is a 401.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing or not a Bearer credential")]
    MissingCredential,
    #[error("credential expired")]
    CredentialExpired,
    #[error("credential failed verification")]
    CredentialInvalid,
    #[error("could not sign credential: {0}")]
    Signing(String),
}

/// bearer_token
///
/// Extracts the raw token from an `Authorization: Bearer <token>` header.
/// A missing header, a non-UTF8 value, a different scheme, or an empty token are all
/// `MissingCredential`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredential)
}

/// verify
///
/// The Identity Verifier. Decodes the token, checks its HS256 signature against the
/// process-wide secret and its expiry, and returns the identity it carries.
/// Pure: no I/O and no state beyond the arguments.
pub fn verify(token: &str, secret: &str) -> Result<Identity, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    // HS256 only; `exp` is required and enforced to the second, with no clock leeway.
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::CredentialExpired,
            // Bad signature, malformed payload, wrong algorithm, unknown role...
            _ => AuthError::CredentialInvalid,
        }
    })?;

    let Claims {
        user_id,
        email,
        role,
        ..
    } = token_data.claims;

    Ok(Identity {
        id: user_id,
        email,
        role,
    })
}

/// authenticate
///
/// Header extraction and verification in one step, as run by the gateway pipeline.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Identity, AuthError> {
    let token = bearer_token(headers)?;
    verify(token, secret)
}

/// issue_token
///
/// Mints a credential in exactly the format `verify` accepts. Used by the auth side of
/// the system after a successful login, and by tests.
pub fn issue_token(identity: &Identity, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AuthError::Signing(e.to_string()))?
        .as_secs();

    let claims = Claims {
        user_id: identity.id,
        email: identity.email.clone(),
        role: identity.role,
        iat: now,
        exp: now + ttl.as_secs(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
}
