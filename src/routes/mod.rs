//! API Routes
//!
//! - `POST /api/query`  - synchronous artwork survey
//! - `GET  /api/ws`     - push-style survey over WebSocket
//! - `GET  /api/health` - health check
//! - `/`                - static file serving (frontend)
//!
//! Unknown `/api/*` paths return a JSON 404 instead of falling through to the
//! asset directory.

pub mod health;
pub mod query;
pub mod static_files;
pub mod ws;

use crate::models::{AppState, ErrorResponse};
use axum::{http::HeaderValue, http::StatusCode, routing::any, Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the main application router. API routes take precedence over static
/// files.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    let api_router = Router::new()
        .merge(query::router(state.clone()))
        .merge(ws::router(state))
        .merge(health::router())
        .route("/api/{*rest}", any(api_not_found));

    Router::new()
        .merge(api_router)
        .merge(static_files::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn api_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::tests::{test_state, MockBrowser, ScriptedAdapter};
    use crate::llm::LLM;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_api_path_returns_json_404() {
        let state = test_state(
            LLM::with_adapter(Box::new(ScriptedAdapter::new(vec![])), "mock"),
            Arc::new(MockBrowser::new(vec![])),
        );
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "Not found");
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_ok() {
        let state = test_state(
            LLM::with_adapter(Box::new(ScriptedAdapter::new(vec![])), "mock"),
            Arc::new(MockBrowser::new(vec![])),
        );
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
    }
}
