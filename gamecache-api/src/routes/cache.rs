//! Cache administration endpoints: invalidation and statistics.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use gamecache_core::CacheBackendKind;
use gamecache_storage::{CacheStats, CacheStore, FetcherStats, InvalidationReport};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    /// Cache type tag. Absent or unrecognized clears everything.
    #[serde(rename = "type")]
    pub cache_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub backend: CacheBackendKind,
    pub store: CacheStats,
    pub hit_rate: f64,
    pub fetcher: FetcherStats,
}

/// GET /api/v1/cache/clear?type=<tag>
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<ClearQuery>,
) -> ApiResult<Json<InvalidationReport>> {
    let report = state
        .invalidation
        .invalidate_selector(query.cache_type.as_deref())
        .await?;
    Ok(Json(report))
}

/// DELETE /api/v1/cache/keys/{key}
pub async fn delete_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<InvalidationReport>> {
    let report = state.invalidation.invalidate_key_str(&key).await?;
    Ok(Json(report))
}

/// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let store = state.store().stats().await?;
    Ok(Json(StatsResponse {
        backend: state.store().backend(),
        hit_rate: store.hit_rate(),
        store,
        fetcher: state.fetcher.stats(),
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/clear", get(clear_cache))
        .route("/keys/:key", delete(delete_key))
        .route("/stats", get(cache_stats))
}
