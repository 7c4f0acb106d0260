//! Health endpoints for orchestrator probes.
//!
//! - `/health/ping`: plain-text liveness
//! - `/health/live`: JSON liveness
//! - `/health/ready`: cache store round trip plus registered providers

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use gamecache_core::{CacheBackendKind, Provider};
use gamecache_storage::CacheStore;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but misses cannot be filled.
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ReadinessDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessDetails {
    pub store: StoreProbe,
    pub backend: CacheBackendKind,
    pub providers: Vec<Provider>,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Outcome of one `CacheStore::ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProbe {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreProbe {
    async fn run<S: CacheStore>(store: &S) -> Self {
        let start = Instant::now();
        match store.ping().await {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Cache store ping failed");
                Self {
                    status: HealthStatus::Unhealthy,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Store down is unhealthy. A live store with no providers can only serve
/// what is already cached, which is degraded.
fn overall(store: HealthStatus, providers: &[Provider]) -> HealthStatus {
    match store {
        HealthStatus::Healthy if providers.is_empty() => HealthStatus::Degraded,
        HealthStatus::Healthy => HealthStatus::Healthy,
        _ => HealthStatus::Unhealthy,
    }
}

/// GET /health/ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health/live
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    })
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = StoreProbe::run(state.store().as_ref()).await;
    let providers = state.fetcher.providers().providers();
    let status = overall(store.status, &providers);

    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let body = HealthResponse {
        status,
        message: None,
        details: Some(ReadinessDetails {
            store,
            backend: state.store().backend(),
            providers,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
        }),
    };

    (code, Json(body))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
