//! Register, login and logout.
//!
//! Responses are JSON with an `HX-Redirect` header on the navigation points so
//! an htmx front end can follow them.

use axum::{
    extract::{Extension, Form},
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

use super::{
    identity::SESSION_COOKIE_NAME,
    state::{AuthConfig, AuthState},
    token::unix_now,
    types::{CredentialsForm, MessageResponse, ValidationErrorResponse},
    utils::normalize_username,
    validation::validate_credentials,
};
use crate::{
    api::handlers::{internal_error, validation_error},
    storage::SharedStore,
};

pub const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

const INCORRECT_CREDENTIALS: &str = "Incorrect username or password";

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 422, description = "Invalid username or password", body = ValidationErrorResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<SharedStore>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let username = normalize_username(&form.username);
    let credentials = match validate_credentials(&username, &form.password) {
        Ok(credentials) => credentials,
        Err(errors) => return validation_error(StatusCode::UNPROCESSABLE_ENTITY, errors),
    };

    let password_hash = match auth_state.hash_password(credentials.password).await {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return internal_error();
        }
    };

    match store
        .create_user(credentials.username.as_str(), &password_hash)
        .await
    {
        Ok(user_id) => {
            info!(user_id = %user_id, "User registered");
            (
                StatusCode::CREATED,
                Json(MessageResponse::new("User successfully created")),
            )
                .into_response()
        }
        // Taken usernames included: the caller only learns that it failed.
        Err(err) => {
            error!("Failed to create user: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = CredentialsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session cookie set", headers(
            ("set-cookie" = String, description = "Session token cookie"),
            ("hx-redirect" = String, description = "Where to navigate next")
        )),
        (status = 401, description = "Incorrect username or password", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<SharedStore>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let username = normalize_username(&form.username);

    // Lookup failures look exactly like a wrong password to the caller.
    let record = match store.find_by_username(&username).await {
        Ok(record) => record,
        Err(err) => {
            error!("Failed to look up user: {err}");
            None
        }
    };

    let user_id = record.as_ref().map(|record| record.id);
    let stored_hash = record.map(|record| record.password_hash);
    let verified = auth_state.verify_login(form.password, stored_hash).await;

    let Some(user_id) = user_id.filter(|_| verified) else {
        info!("Rejected login attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(MessageResponse::new(INCORRECT_CREDENTIALS)),
        )
            .into_response();
    };

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    let expires_at = unix_now().saturating_add(ttl_seconds);
    let token = match auth_state.tokens().issue(user_id, expires_at) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return internal_error();
        }
    };

    let cookie = match session_cookie(auth_state.config(), &token, expires_at) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return internal_error();
        }
    };

    info!(user_id = %user_id, "User logged in");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    headers.insert(HX_REDIRECT, HeaderValue::from_static("/notes"));
    (StatusCode::OK, headers).into_response()
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", headers(
            ("set-cookie" = String, description = "Expired session cookie"),
            ("hx-redirect" = String, description = "Where to navigate next")
        ))
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> Response {
    // Tokens are stateless; clearing the cookie is all there is to do.
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie(auth_state.config()));
    headers.insert(HX_REDIRECT, HeaderValue::from_static("/"));
    (StatusCode::OK, headers).into_response()
}

/// `HttpOnly` session cookie whose `Expires` matches the token expiry.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    expires_at: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let expires = http_date(expires_at);
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={expires}; Max-Age={ttl_seconds}"
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(config: &AuthConfig) -> HeaderValue {
    if config.secure_cookies() {
        HeaderValue::from_static(
            "token=; Path=/; HttpOnly; SameSite=Lax; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Secure",
        )
    } else {
        HeaderValue::from_static(
            "token=; Path=/; HttpOnly; SameSite=Lax; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0",
        )
    }
}

/// RFC 7231 IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
fn http_date(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_date_formats_imf_fixdate() {
        assert_eq!(http_date(0), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(http_date(1_700_000_000), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn session_cookie_attributes() -> anyhow::Result<()> {
        let config = AuthConfig::new();
        let cookie = session_cookie(&config, "abc", 0)?;
        assert_eq!(
            cookie.to_str()?,
            "token=abc; Path=/; HttpOnly; SameSite=Lax; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=14400"
        );

        let secure = AuthConfig::new().with_secure_cookies(true);
        assert!(session_cookie(&secure, "abc", 0)?.to_str()?.ends_with("; Secure"));
        Ok(())
    }

    #[test]
    fn longest_session_cookie_has_a_real_expiry() -> anyhow::Result<()> {
        let config = AuthConfig::new().with_session_ttl_seconds(i64::MAX);
        let ttl = config.session_ttl_seconds();
        let cookie = session_cookie(&config, "abc", unix_now() + ttl)?;
        let value = cookie.to_str()?;
        assert!(value.contains("Max-Age=31536000"), "{value}");
        assert!(!value.contains("1970"), "{value}");
        Ok(())
    }

    #[test]
    fn cleared_cookie_is_expired_and_http_only() -> anyhow::Result<()> {
        let cleared = clear_session_cookie(&AuthConfig::new());
        let value = cleared.to_str()?;
        assert!(value.starts_with("token=;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=0"));
        assert!(value.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(!value.contains("Secure"));
        Ok(())
    }
}
