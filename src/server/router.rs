use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::config::ServerConfig;
use crate::server::handlers::{ask, download, health, nuclia_ask};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware (configured origins, or any origin when none are set)
/// - Health check endpoint
/// - The two ask routes
/// - The file download proxy
/// - A request span tagged with a fresh request id
///
/// # Arguments
///
/// * `state` - Shared application state
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server);
    Router::new()
        .route("/health", get(health::health))
        .route("/ask", post(ask::ask))
        .route("/nuclia-ask", post(nuclia_ask::nuclia_ask))
        .route("/download/:resource_id/:file_id", get(download::download))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
}

fn build_cors_layer(server: &ServerConfig) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&server.cors_allowed_origins);

    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

fn resolve_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect()
}
