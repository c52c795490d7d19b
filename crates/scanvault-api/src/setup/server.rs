//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use scanvault_core::Config;

use crate::constants::SHUTDOWN_GRACE_PERIOD;
use crate::state::AppState;

/// Serve until a shutdown signal arrives, then give running analyses a
/// grace period to finish.
pub async fn start_server(config: &Config, state: &AppState, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.host(), config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        version = %config.version(),
        max_upload_size = config.max_upload_size(),
        upload_timeout_secs = config.upload_timeout().as_secs(),
        environment = %config.environment(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let scheduled = state.service.analyses_scheduled();
    if scheduled > 0 {
        tracing::info!(scheduled, "Waiting for running analyses");
    }
    if state.service.shutdown(SHUTDOWN_GRACE_PERIOD).await {
        tracing::info!("All analyses finished");
    }

    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
