use crate::{
    api::handlers::auth::{resolve_identity, AuthConfig, AuthState, PasswordHasher, TokenCodec},
    storage::{PgStore, SharedStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware, Extension, Router,
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the application: documented routes, Swagger UI, request ids,
/// tracing and identity resolution.
pub fn app(store: SharedStore, auth_state: Arc<AuthState>) -> Router {
    let (router, openapi) = router().split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn_with_state(
                    auth_state.clone(),
                    resolve_identity,
                ))
                .layer(Extension(auth_state))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if the signing secret is unusable, the database is unreachable
/// or the listener cannot be bound
pub async fn new(
    port: u16,
    dsn: &str,
    jwt_secret: &SecretString,
    auth_config: AuthConfig,
) -> Result<()> {
    let tokens = TokenCodec::new(jwt_secret).context("Refusing to start without a signing secret")?;
    let hasher = PasswordHasher::new().context("Invalid password hashing parameters")?;
    let auth_state = Arc::new(
        AuthState::new(auth_config, tokens, hasher).context("Failed to initialize password hashing")?,
    );

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let store: SharedStore = Arc::new(PgStore::new(pool));

    let app = app(store, auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
