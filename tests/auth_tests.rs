use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderValue, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mov_gateway::{
    auth::{self, AuthError, Claims},
    models::{Identity, Role},
};
use serde_json::json;

const SECRET: &str = "auth-test-secret";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn organizer() -> Identity {
    Identity {
        id: 7,
        email: "org@example.com".to_string(),
        role: Role::Organizer,
    }
}

fn sign(claims: &impl serde::Serialize, alg: Algorithm, secret: &str) -> String {
    encode(
        &Header::new(alg),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn bearer(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
}

// --- verify ---

#[test]
fn test_valid_token_yields_identity() {
    let claims = Claims {
        user_id: 1,
        email: "p@example.com".to_string(),
        role: Role::Participant,
        iat: now(),
        exp: now() + 3600,
    };
    let token = sign(&claims, Algorithm::HS256, SECRET);

    let identity = auth::verify(&token, SECRET).unwrap();
    assert_eq!(
        identity,
        Identity {
            id: 1,
            email: "p@example.com".to_string(),
            role: Role::Participant,
        }
    );
}

#[test]
fn test_expired_token_is_credential_expired() {
    let claims = json!({
        "userId": 1, "email": "p@example.com", "role": "PARTICIPANT",
        "iat": now() - 7200, "exp": now() - 3600,
    });
    let token = sign(&claims, Algorithm::HS256, SECRET);

    assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialExpired));
}

#[test]
fn test_token_expired_seconds_ago_is_rejected() {
    // No clock tolerance: a few seconds past `exp` is already expired.
    for ago in [5, 30] {
        let claims = json!({
            "userId": 1, "email": "p@example.com", "role": "PARTICIPANT",
            "iat": now() - 600, "exp": now() - ago,
        });
        let token = sign(&claims, Algorithm::HS256, SECRET);

        assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialExpired));
    }
}

#[test]
fn test_wrong_secret_is_credential_invalid() {
    let token = auth::issue_token(&organizer(), "another-secret", Duration::from_secs(60)).unwrap();
    assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialInvalid));
}

#[test]
fn test_wrong_algorithm_is_credential_invalid() {
    let claims = json!({
        "userId": 1, "email": "p@example.com", "role": "PARTICIPANT",
        "iat": now(), "exp": now() + 3600,
    });
    let token = sign(&claims, Algorithm::HS512, SECRET);

    assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialInvalid));
}

#[test]
fn test_malformed_payloads_are_credential_invalid() {
    // Unknown role.
    let claims = json!({
        "userId": 1, "email": "a@example.com", "role": "ADMIN",
        "iat": now(), "exp": now() + 3600,
    });
    let token = sign(&claims, Algorithm::HS256, SECRET);
    assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialInvalid));

    // Missing email.
    let claims = json!({ "userId": 1, "role": "ORGANIZER", "iat": now(), "exp": now() + 3600 });
    let token = sign(&claims, Algorithm::HS256, SECRET);
    assert_eq!(auth::verify(&token, SECRET), Err(AuthError::CredentialInvalid));

    // Not a JWT at all.
    assert_eq!(auth::verify("garbage", SECRET), Err(AuthError::CredentialInvalid));
}

// --- Header extraction ---

#[test]
fn test_missing_or_malformed_header_is_missing_credential() {
    assert_eq!(
        auth::authenticate(&HeaderMap::new(), SECRET),
        Err(AuthError::MissingCredential)
    );
    assert_eq!(
        auth::authenticate(&bearer("Basic dXNlcjpwYXNz"), SECRET),
        Err(AuthError::MissingCredential)
    );
    assert_eq!(
        auth::authenticate(&bearer("Bearer "), SECRET),
        Err(AuthError::MissingCredential)
    );
    assert_eq!(
        auth::authenticate(&bearer("bearer abc"), SECRET),
        Err(AuthError::MissingCredential)
    );
}

#[test]
fn test_authenticate_reads_bearer_header() {
    let token = auth::issue_token(&organizer(), SECRET, Duration::from_secs(60)).unwrap();
    let headers = bearer(&format!("Bearer {token}"));

    assert_eq!(auth::bearer_token(&headers), Ok(token.as_str()));
    assert_eq!(auth::authenticate(&headers, SECRET), Ok(organizer()));
}

// --- issue_token ---

#[test]
fn test_issued_token_carries_expected_claims() {
    let token = auth::issue_token(&organizer(), SECRET, Duration::from_secs(3600)).unwrap();

    let data = jsonwebtoken::decode::<serde_json::Value>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(SECRET.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .unwrap();

    assert_eq!(data.header.alg, Algorithm::HS256);
    assert_eq!(data.claims["userId"], 7);
    assert_eq!(data.claims["email"], "org@example.com");
    assert_eq!(data.claims["role"], "ORGANIZER");

    let iat = data.claims["iat"].as_u64().unwrap();
    let exp = data.claims["exp"].as_u64().unwrap();
    assert_eq!(exp - iat, 3600);
}
