//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use scanvault_core::Config;

use crate::state::AppState;

/// Validate configuration, start logging, connect the backends and build the router.
pub async fn initialize_app(config: &Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        version = %config.version(),
        information = %config.information(),
        "Configuration loaded and validated successfully"
    );

    let state = services::initialize_services(config).await?;
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
