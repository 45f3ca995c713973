//! Public share links.
//!
//! Creating a link needs a session; reading one does not. A link is a copy of
//! the title and content at the time it was made.

use axum::{
    extract::{Extension, Form, Path},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{
    auth::{session::HX_REDIRECT, types::ValidationErrorResponse, CurrentUser, MessageResponse},
    internal_error,
    notes::{validate_note, NoteForm},
    not_found, validation_error,
};
use crate::storage::{ShareLink, SharedStore};

const ID_BYTES: usize = 16;

#[derive(ToSchema, Serialize, Debug)]
pub struct ShareLinkCreated {
    pub id: String,
}

/// 32 lowercase hex characters from the OS RNG.
fn generate_share_id() -> Result<String, rand::Error> {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

fn is_share_id(id: &str) -> bool {
    id.len() == ID_BYTES * 2 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[utoipa::path(
    post,
    path = "/sharelinks",
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Share link created", body = ShareLinkCreated, headers(
            ("hx-redirect" = String, description = "Public URL of the link")
        )),
        (status = 401, description = "Not logged in", body = MessageResponse),
        (status = 422, description = "Invalid title or content", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "sharelinks"
)]
pub async fn create_share_link(
    CurrentUser(user_id): CurrentUser,
    store: Extension<SharedStore>,
    Form(form): Form<NoteForm>,
) -> Response {
    let note = match validate_note(&form) {
        Ok(note) => note,
        Err(errors) => return validation_error(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    let id = match generate_share_id() {
        Ok(id) => id,
        Err(err) => {
            error!("Failed to generate share link id: {err}");
            return internal_error();
        }
    };

    let link = ShareLink {
        id,
        title: note.title,
        content: note.content,
    };
    if let Err(err) = store.create_share_link(&link).await {
        error!("Failed to create share link: {err}");
        return internal_error();
    }

    info!(user_id = %user_id, share_link = %link.id, "Share link created");

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&format!("/sharelinks/{}", link.id)) {
        Ok(location) => {
            headers.insert(HX_REDIRECT, location);
        }
        Err(err) => error!("Failed to build redirect header: {err}"),
    }

    (
        StatusCode::CREATED,
        headers,
        Json(ShareLinkCreated { id: link.id }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/sharelinks/{id}",
    params(("id" = String, Path, description = "Share link id")),
    responses(
        (status = 200, description = "The shared snapshot", body = ShareLink),
        (status = 404, description = "No such share link", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "sharelinks"
)]
pub async fn get_share_link(store: Extension<SharedStore>, Path(id): Path<String>) -> Response {
    if !is_share_id(&id) {
        return not_found();
    }

    match store.get_share_link(&id).await {
        Ok(Some(link)) => Json(link).into_response(),
        Ok(None) => not_found(),
        Err(err) => {
            error!("Failed to load share link: {err}");
            internal_error()
        }
    }
}
