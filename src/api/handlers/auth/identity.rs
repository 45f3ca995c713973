//! Request identity.
//!
//! [`resolve_identity`] runs on every request and stores an [`Identity`] in the
//! request extensions. It never rejects: anything short of a valid token is
//! `Anonymous`. Handlers that need a user take [`CurrentUser`], which answers
//! `401` on their behalf.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::COOKIE, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::{convert::Infallible, sync::Arc};
use tracing::debug;

use super::{state::AuthState, token::TokenCodec, types::MessageResponse};
use crate::storage::UserId;

pub const SESSION_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl Identity {
    #[must_use]
    pub fn user_id(self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(id) => Some(id),
        }
    }
}

/// Resolve the caller from the session cookie and continue.
pub async fn resolve_identity(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = identify(auth_state.tokens(), request.headers());
    request.extensions_mut().insert(identity);
    next.run(request).await
}

pub(super) fn identify(tokens: &TokenCodec, headers: &HeaderMap) -> Identity {
    let Some(token) = extract_session_token(headers) else {
        return Identity::Anonymous;
    };
    match tokens.verify(&token) {
        Ok(user_id) => Identity::Authenticated(user_id),
        Err(err) => {
            debug!("Ignoring session token: {err}");
            Identity::Anonymous
        }
    }
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Routes mounted without the middleware see everyone as anonymous.
        Ok(parts
            .extensions
            .get::<Identity>()
            .copied()
            .unwrap_or_default())
    }
}

/// An authenticated caller. Rejects anonymous requests with `401`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Identity>()
            .copied()
            .unwrap_or_default();
        identity.user_id().map(CurrentUser).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(MessageResponse::new("Unauthorized")),
            )
                .into_response()
        })
    }
}
