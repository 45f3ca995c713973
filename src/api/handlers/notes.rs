//! Notes of the logged-in user.
//!
//! Every query is scoped by owner, so another user's note answers `404` exactly
//! like a note that was never created.

use axum::{
    extract::{Extension, Form, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{
    auth::{
        types::ValidationErrorResponse, validation::Validator, CurrentUser, MessageResponse,
        ValidationErrors,
    },
    internal_error, not_found, validation_error,
};
use crate::storage::{Note, SharedStore};

pub const TITLE_FIELD: &str = "title";
pub const CONTENT_FIELD: &str = "content";
pub const TITLE_MAX_LENGTH: usize = 200;
pub const CONTENT_MAX_LENGTH: usize = 100_000;

#[derive(ToSchema, Deserialize, Debug, Clone)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Title (trimmed) and content after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNote {
    pub title: String,
    pub content: String,
}

/// Title must be 1 to 200 characters after trimming; content at most 100 000.
///
/// # Errors
/// Returns every violation found.
pub fn validate_note(form: &NoteForm) -> Result<ValidNote, ValidationErrors> {
    let title = form.title.trim();
    let mut validator = Validator::new();
    validator.check_min_length(1, title, TITLE_FIELD);
    validator.check_max_length(TITLE_MAX_LENGTH, title, TITLE_FIELD);
    validator.check_max_length(CONTENT_MAX_LENGTH, &form.content, CONTENT_FIELD);

    if validator.is_valid() {
        Ok(ValidNote {
            title: title.to_string(),
            content: form.content.clone(),
        })
    } else {
        Err(validator.into_errors())
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "Notes of the caller, newest first", body = [Note]),
        (status = 401, description = "Not logged in", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "notes"
)]
pub async fn list_notes(CurrentUser(user_id): CurrentUser, store: Extension<SharedStore>) -> Response {
    match store.list_notes(user_id).await {
        Ok(notes) => Json(notes).into_response(),
        Err(err) => {
            error!("Failed to list notes: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Note created", body = Note),
        (status = 401, description = "Not logged in", body = MessageResponse),
        (status = 422, description = "Invalid title or content", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "notes"
)]
pub async fn create_note(
    CurrentUser(user_id): CurrentUser,
    store: Extension<SharedStore>,
    Form(form): Form<NoteForm>,
) -> Response {
    let note = match validate_note(&form) {
        Ok(note) => note,
        Err(errors) => return validation_error(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    match store.create_note(user_id, &note.title, &note.content).await {
        Ok(note) => {
            info!(user_id = %user_id, note_id = note.id, "Note created");
            (StatusCode::CREATED, Json(note)).into_response()
        }
        Err(err) => {
            error!("Failed to create note: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = Note),
        (status = 401, description = "Not logged in", body = MessageResponse),
        (status = 404, description = "No such note for this user", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "notes"
)]
pub async fn get_note(
    CurrentUser(user_id): CurrentUser,
    store: Extension<SharedStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.get_note(user_id, id).await {
        Ok(Some(note)) => Json(note).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to load note: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note id")),
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Note updated", body = Note),
        (status = 401, description = "Not logged in", body = MessageResponse),
        (status = 404, description = "No such note for this user", body = MessageResponse),
        (status = 422, description = "Invalid title or content", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "notes"
)]
pub async fn update_note(
    CurrentUser(user_id): CurrentUser,
    store: Extension<SharedStore>,
    Path(id): Path<i64>,
    Form(form): Form<NoteForm>,
) -> Response {
    let note = match validate_note(&form) {
        Ok(note) => note,
        Err(errors) => return validation_error(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    match store
        .update_note(user_id, id, &note.title, &note.content)
        .await
    {
        Ok(Some(note)) => Json(note).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to update note: {err}");
            internal_error()
        }
    }
}
