use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::AuthError,
    events::{lifecycle::LifecycleError, repository::RepositoryError},
    gateway::policy::AccessDenied,
    response::{ErrorBody, FieldError},
};

/// ErrorCode
///
/// Machine-readable codes carried in the failure envelope's `errorCode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Authentication,
    Authorization,
    NotFound,
    Validation,
    InvalidStateTransition,
    HasParticipants,
    DuplicateEntry,
    Conflict,
    RateLimited,
    ServiceUnavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Authentication => "AUTHENTICATION_ERROR",
            ErrorCode::Authorization => "AUTHORIZATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::HasParticipants => "HAS_PARTICIPANTS",
            ErrorCode::DuplicateEntry => "DUPLICATE_ENTRY",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::RateLimited => "RATE_LIMIT_EXCEEDED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

/// ApiError
///
/// The complete failure taxonomy shared by the gateway and the event service.
/// Components below the HTTP layer return their own typed errors, which convert into
/// this enum; `into_response` is the only place a failure kind becomes a status code
/// and a wire envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No token provided")]
    MissingCredential,
    #[error("Token expired")]
    CredentialExpired,
    #[error("Invalid token")]
    CredentialInvalid,
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("{0}")]
    NotOwner(String),
    #[error("Route not found")]
    RouteNotFound,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    IllegalTransition(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Cannot delete event with registered participants")]
    HasParticipants,
    #[error("Validation error")]
    Validation(Vec<FieldError>),
    #[error("Duplicate entry")]
    DuplicateEntry,
    #[error("Resource was modified concurrently, retry the request")]
    ConflictRetry,
    #[error("Too many requests from this IP, please try again later.")]
    RateLimited,
    #[error("Service temporarily unavailable")]
    ServiceUnavailable(String),
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential
            | ApiError::CredentialExpired
            | ApiError::CredentialInvalid
            | ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientPermissions | ApiError::NotOwner(_) => StatusCode::FORBIDDEN,
            ApiError::RouteNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::IllegalTransition(_)
            | ApiError::InvalidState(_)
            | ApiError::HasParticipants
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEntry | ApiError::ConflictRetry => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MissingCredential
            | ApiError::CredentialExpired
            | ApiError::CredentialInvalid
            | ApiError::AuthenticationRequired => ErrorCode::Authentication,
            ApiError::InsufficientPermissions | ApiError::NotOwner(_) => ErrorCode::Authorization,
            ApiError::RouteNotFound | ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::IllegalTransition(_) | ApiError::InvalidState(_) => {
                ErrorCode::InvalidStateTransition
            }
            ApiError::HasParticipants => ErrorCode::HasParticipants,
            ApiError::Validation(_) => ErrorCode::Validation,
            ApiError::DuplicateEntry => ErrorCode::DuplicateEntry,
            ApiError::ConflictRetry => ErrorCode::Conflict,
            ApiError::RateLimited => ErrorCode::RateLimited,
            ApiError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            // The forwarding engine has already logged the cause; the caller sees it too.
            ApiError::ServiceUnavailable(cause) => ErrorBody {
                success: false,
                message: format!("Service temporarily unavailable: {cause}"),
                error_code: Some(code.as_str().to_string()),
                errors: None,
            },
            // Internal causes are logged, never echoed.
            ApiError::Internal(cause) => {
                tracing::error!(%cause, "internal error");
                ErrorBody {
                    success: false,
                    message: "Internal server error".to_string(),
                    error_code: Some(code.as_str().to_string()),
                    errors: None,
                }
            }
            ApiError::Validation(errors) => ErrorBody {
                success: false,
                message: "Validation error".to_string(),
                error_code: Some(code.as_str().to_string()),
                errors: Some(errors),
            },
            other => ErrorBody {
                success: false,
                message: other.to_string(),
                error_code: Some(code.as_str().to_string()),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

// --- Component error conversions ---

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ApiError::MissingCredential,
            AuthError::CredentialExpired => ApiError::CredentialExpired,
            AuthError::CredentialInvalid => ApiError::CredentialInvalid,
            AuthError::Signing(cause) => ApiError::Internal(cause),
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        match err {
            AccessDenied::AuthenticationRequired => ApiError::AuthenticationRequired,
            AccessDenied::InsufficientPermissions => ApiError::InsufficientPermissions,
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::NotOwner { .. } => ApiError::NotOwner(message),
            LifecycleError::IllegalTransition { .. } => ApiError::IllegalTransition(message),
            LifecycleError::InvalidState { .. } => ApiError::InvalidState(message),
            LifecycleError::HasParticipants { .. } => ApiError::HasParticipants,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound("Event not found".to_string()),
            RepositoryError::Duplicate => ApiError::DuplicateEntry,
            RepositoryError::Conflict => ApiError::ConflictRetry,
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
            RepositoryError::Corrupt(msg) => ApiError::Internal(msg),
        }
    }
}
