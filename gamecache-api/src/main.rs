//! gamecache API Server Entry Point
//!
//! Bootstraps configuration, opens the configured cache store and starts
//! the Axum HTTP server.

use axum::Router;
use gamecache_api::{create_router, init_tracing, ApiError, ApiResult, AppState, LogFormat, ServiceConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env()?)?;

    let config = ServiceConfig::from_env()?;
    config.validate()?;

    let state = AppState::from_config(&config).await?;
    let app: Router = create_router(state, &config.api);

    let addr = config.api.bind_addr()?;
    tracing::info!(%addr, backend = %config.cache.backend, "Starting gamecache API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
