use crate::{storage::SharedStore, GIT_COMMIT_HASH};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses (
        (status = 200, description = "Database is reachable", body = Health),
        (status = 503, description = "Database is unreachable", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(store: Extension<SharedStore>) -> impl IntoResponse {
    let result = store.ping().await;
    if let Err(err) = &result {
        error!("Failed to ping database: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if result.is_ok() { "ok" } else { "error" }.to_string(),
    };

    let short_hash = health.commit.get(..7).unwrap_or_default();

    let mut headers = HeaderMap::new();
    match format!("{}:{}:{}", health.name, health.version, short_hash).parse::<HeaderValue>() {
        Ok(x_app) => {
            debug!("X-App header: {:?}", x_app);
            headers.insert("X-App", x_app);
        }
        Err(err) => error!("Failed to parse X-App header: {}", err),
    }

    let status = if result.is_ok() {
        debug!("Database connection is healthy");
        StatusCode::OK
    } else {
        debug!("Database connection is unhealthy");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::Result;
    use axum::{body::to_bytes, routing::get, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn call(store: Arc<MemoryStore>) -> Result<(StatusCode, HeaderMap, serde_json::Value)> {
        let shared: SharedStore = store;
        let app = Router::new()
            .route("/health", get(health))
            .layer(Extension(shared));
        let response = app
            .oneshot(axum::http::Request::get("/health").body(axum::body::Body::empty())?)
            .await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, headers, serde_json::from_slice(&body)?))
    }

    #[tokio::test]
    async fn healthy_store_reports_ok() -> Result<()> {
        let (status, headers, body) = call(Arc::new(MemoryStore::new())).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        let x_app = headers
            .get("X-App")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(x_app.starts_with(concat!(
            env!("CARGO_PKG_NAME"),
            ":",
            env!("CARGO_PKG_VERSION"),
            ":"
        )));
        Ok(())
    }

    #[tokio::test]
    async fn failing_store_is_unavailable() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (status, _, body) = call(store).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "error");
        Ok(())
    }
}
