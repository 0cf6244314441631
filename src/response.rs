use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// ApiResponse
///
/// The success envelope returned by every endpoint in both services:
/// `{ "success": true, "message": "...", "data": { ... } }`. `data` is omitted when
/// there is nothing to return (e.g. after a delete).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Success<T> {
        Success::new(StatusCode::OK, message, Some(data))
    }

    /// 201 Created with a payload.
    pub fn created(message: impl Into<String>, data: T) -> Success<T> {
        Success::new(StatusCode::CREATED, message, Some(data))
    }
}

impl ApiResponse<()> {
    /// 200 OK with no `data` field.
    pub fn message(message: impl Into<String>) -> Success<()> {
        Success::new(StatusCode::OK, message, None)
    }
}

/// Success
///
/// A success envelope paired with its status code, ready to be returned from a handler.
#[derive(Debug)]
pub struct Success<T> {
    status: StatusCode,
    body: ApiResponse<T>,
}

impl<T> Success<T> {
    fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            body: ApiResponse {
                success: true,
                message: message.into(),
                data,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// FieldError
///
/// One entry of the ordered `errors` list attached to validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// ErrorBody
///
/// The failure envelope: `{ "success": false, "message": "...", "errorCode": "...",
/// "errors": [ { "field": "...", "message": "..." } ] }`. Built only by
/// `ApiError::into_response`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}
