//! Liveness, backend health and operator endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use scanvault_core::{HealthReport, StalledAnalysis};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
    pub version: String,
    pub information: String,
}

pub async fn root() -> Redirect {
    Redirect::permanent("/ping")
}

#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses(
        (status = 200, description = "Every backend is reachable", body = PingResponse),
        (status = 503, description = "At least one backend is unreachable", body = PingResponse)
    )
)]
pub async fn ping(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, message) = match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "PONG : everything is good".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "service unavailable".to_string())
        }
    };

    (
        status,
        Json(PingResponse {
            message,
            version: state.service.version().to_string(),
            information: state.service.information().to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All backends healthy", body = HealthReport),
        (status = 503, description = "At least one backend degraded", body = HealthReport)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.service.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[utoipa::path(
    get,
    path = "/analyses/stalled",
    tag = "health",
    responses(
        (status = 200, description = "Documents whose analysis gave up, oldest first", body = Vec<StalledAnalysis>)
    )
)]
pub async fn stalled_analyses(State(state): State<Arc<AppState>>) -> Json<Vec<StalledAnalysis>> {
    Json(state.service.stalled_analyses())
}
