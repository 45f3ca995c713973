//! Route handlers and the error responses they share.

pub mod auth;
pub mod health;
pub mod notes;
pub mod sharelinks;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use auth::{types::ValidationErrorResponse, MessageResponse, ValidationErrors};

const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// `{"errors": {field: [messages]}}` with the given status.
pub(crate) fn validation_error(status: StatusCode, errors: ValidationErrors) -> Response {
    (status, Json(ValidationErrorResponse { errors })).into_response()
}

/// Generic `500`. Details belong in the log, never in the body.
pub(crate) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::new(INTERNAL_SERVER_ERROR)),
    )
        .into_response()
}

pub(crate) fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new("Not Found"))).into_response()
}
