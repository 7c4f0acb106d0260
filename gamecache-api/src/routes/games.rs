//! Game metadata read-through endpoints.
//!
//! `GET /api/v1/games/{provider}/{kind}?<params>` serves a resource through
//! the cache. `refresh=true` forces a provider call; `bypass=true` skips the
//! store entirely. Game lists and details are enriched with the viewer named
//! by the `x-viewer-id` header.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use gamecache_core::{
    CacheType, GameDetail, GamePage, Provider, RequestParams, ResourceKind, Timestamp, ViewerId,
};
use gamecache_storage::{FetchOptions, OverlayCompositor, ReadStatus};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::{AnyViewerStateStore, AppState};

/// Header carrying the viewer whose list state is overlaid.
pub const VIEWER_HEADER: &str = "x-viewer-id";

// ============================================================================
// TYPES
// ============================================================================

/// Body of a read-through fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub key: String,
    pub cache_type: CacheType,
    pub status: ReadStatus,
    pub refreshed_at: Timestamp,
    /// Upstream failure message when a stale entry was served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub data: serde_json::Value,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/games/{provider}/{kind}
pub async fn fetch_resource(
    State(state): State<AppState>,
    Path((provider, kind)): Path<(String, String)>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> ApiResult<Json<FetchResponse>> {
    let provider: Provider = provider
        .parse()
        .map_err(|e: gamecache_core::EnumParseError| ApiError::invalid_input(e.to_string()))?;
    let kind: ResourceKind = kind
        .parse()
        .map_err(|e: gamecache_core::EnumParseError| ApiError::invalid_input(e.to_string()))?;
    let viewer = viewer_from_headers(&headers)?;

    let mut params = RequestParams::try_from_pairs(query)?;
    let options = FetchOptions::new()
        .with_force_refresh(take_flag(&mut params, "refresh")?)
        .with_bypass_cache(take_flag(&mut params, "bypass")?);

    let read = state.fetcher.fetch(provider, kind, &params, options).await?;

    let key = read.key().to_string();
    let cache_type = read.cache_type();
    let status = read.status();
    let refreshed_at = read.refreshed_at();
    let warning = read.warning().map(str::to_string);
    let data = enrich(&state.compositor, kind, read.into_value(), viewer).await?;

    Ok(Json(FetchResponse {
        key,
        cache_type,
        status,
        refreshed_at,
        warning,
        data,
    }))
}

/// Merge viewer state into game lists and details. Other payloads pass
/// through untouched.
async fn enrich(
    compositor: &OverlayCompositor<AnyViewerStateStore>,
    kind: ResourceKind,
    payload: serde_json::Value,
    viewer: Option<ViewerId>,
) -> ApiResult<serde_json::Value> {
    if kind.is_game_list() {
        let mut page: GamePage = serde_json::from_value(payload)?;
        let results = std::mem::take(&mut page.results);
        let enriched = compositor.composite(results, viewer).await?;
        return Ok(serde_json::to_value(page.with_results(enriched))?);
    }
    if kind == ResourceKind::Detail {
        let detail: GameDetail = serde_json::from_value(payload)?;
        let enriched = compositor.composite_one(detail, viewer).await?;
        return Ok(serde_json::to_value(enriched)?);
    }
    Ok(payload)
}

/// Absent or blank header is an anonymous request; anything else must be a
/// UUID.
pub fn viewer_from_headers(headers: &HeaderMap) -> ApiResult<Option<ViewerId>> {
    let Some(value) = headers.get(VIEWER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::invalid_format(VIEWER_HEADER, "UUID"))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse::<ViewerId>()
        .map(Some)
        .map_err(|_| ApiError::invalid_format(VIEWER_HEADER, "UUID"))
}

fn take_flag(params: &mut RequestParams, name: &str) -> ApiResult<bool> {
    match params.remove(name) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ApiError::invalid_format(name, "true or false")),
        },
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:provider/:kind", get(fetch_resource))
}
