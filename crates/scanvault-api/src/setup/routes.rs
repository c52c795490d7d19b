//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{HTTP_CONCURRENCY_LIMIT, MULTIPART_OVERHEAD, OPENAPI_JSON_PATH};
use crate::handlers::{documents, health};
use crate::state::AppState;

/// Largest request body accepted: the upload limit plus multipart framing.
pub fn request_body_limit(max_upload_size: u64) -> usize {
    usize::try_from(max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD)
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    let body_limit = request_body_limit(state.limits.max_upload_size);

    Router::new()
        .route("/", get(health::root))
        .route("/ping", get(health::ping))
        .route("/health", get(health::health_check))
        .route("/analyses/stalled", get(health::stalled_analyses))
        .route("/documents", post(documents::upload_document))
        .route("/documents/{id}", get(documents::get_document))
        .route(
            OPENAPI_JSON_PATH,
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_JSON_PATH).path("/docs"))
        // The limit layer below replaces axum's fixed 2 MB default.
        .layer(DefaultBodyLimit::disable())
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limit_adds_multipart_overhead() {
        assert_eq!(request_body_limit(1 << 20), (1 << 20) + 2048);
        assert_eq!(request_body_limit(u64::MAX), usize::MAX);
    }
}
