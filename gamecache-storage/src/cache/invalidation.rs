//! Out-of-band cache invalidation.

use std::sync::Arc;

use gamecache_core::{CacheKey, CacheType, GameCacheResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::traits::CacheStore;

/// What to clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    Key(CacheKey),
    Type(CacheType),
    All,
}

impl InvalidationScope {
    /// Label reported back to callers: the key, the type tag, or `all`.
    pub fn label(&self) -> String {
        match self {
            InvalidationScope::Key(key) => key.to_string(),
            InvalidationScope::Type(cache_type) => cache_type.as_str().to_string(),
            InvalidationScope::All => "all".to_string(),
        }
    }
}

/// Outcome of an invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationReport {
    pub message: String,
    pub cleared_entries: u64,
    pub cache_type: String,
}

impl InvalidationReport {
    fn new(label: String, cleared_entries: u64) -> Self {
        Self {
            message: format!("Cleared {} cache entries for {}", cleared_entries, label),
            cleared_entries,
            cache_type: label,
        }
    }
}

/// Clears entries by key, by type, or entirely. Never errors on an
/// unrecognized selector.
pub struct InvalidationManager<S: CacheStore> {
    store: Arc<S>,
}

impl<S: CacheStore> InvalidationManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn invalidate(&self, scope: InvalidationScope) -> GameCacheResult<InvalidationReport> {
        let cleared = match &scope {
            InvalidationScope::Key(key) => self.store.delete_by_key(key).await?,
            InvalidationScope::Type(cache_type) => self.store.delete_by_type(*cache_type).await?,
            InvalidationScope::All => self.store.delete_all().await?,
        };
        let label = scope.label();
        info!(scope = %label, cleared, "cache invalidated");
        Ok(InvalidationReport::new(label, cleared))
    }

    /// Clear one type by its tag. Unknown tags clear nothing.
    pub async fn invalidate_tag(&self, tag: &str) -> GameCacheResult<InvalidationReport> {
        match tag.parse::<CacheType>() {
            Ok(cache_type) => self.invalidate(InvalidationScope::Type(cache_type)).await,
            Err(_) => {
                debug!(tag, "unknown cache type tag, nothing to clear");
                Ok(InvalidationReport::new(tag.to_string(), 0))
            }
        }
    }

    /// Selector semantics of the HTTP clear endpoint: a recognized type tag
    /// clears that type; a missing, blank or unrecognized selector clears
    /// everything.
    pub async fn invalidate_selector(&self, selector: Option<&str>) -> GameCacheResult<InvalidationReport> {
        let scope = selector
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .and_then(|s| s.parse::<CacheType>().ok())
            .map(InvalidationScope::Type)
            .unwrap_or(InvalidationScope::All);
        self.invalidate(scope).await
    }

    /// Clear one entry by its raw key. Unparseable keys clear nothing.
    pub async fn invalidate_key_str(&self, raw: &str) -> GameCacheResult<InvalidationReport> {
        match CacheKey::parse(raw) {
            Ok(key) => self.invalidate(InvalidationScope::Key(key)).await,
            Err(err) => {
                debug!(key = raw, error = %err, "unparseable cache key, nothing to clear");
                Ok(InvalidationReport::new(raw.to_string(), 0))
            }
        }
    }
}

impl<S: CacheStore> Clone for InvalidationManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCacheStore;
    use chrono::Utc;
    use gamecache_core::{build_key, CacheEntry, Provider, RequestParams, ResourceKind};

    async fn seeded() -> (InvalidationManager<InMemoryCacheStore>, Arc<InMemoryCacheStore>, CacheKey) {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut detail_key = None;
        for (kind, params) in [
            (ResourceKind::Trending, RequestParams::new().with("page", 1)),
            (ResourceKind::Trending, RequestParams::new().with("page", 2)),
            (ResourceKind::Detail, RequestParams::new().with("id", 10)),
        ] {
            let (key, _) = build_key(Provider::Rawg, kind, &params).expect("valid key");
            if kind == ResourceKind::Detail {
                detail_key = Some(key.clone());
            }
            store
                .put(CacheEntry::new(key, serde_json::json!({}), Utc::now()))
                .await
                .expect("put");
        }
        let manager = InvalidationManager::new(store.clone());
        (manager, store, detail_key.expect("seeded detail"))
    }

    #[tokio::test]
    async fn test_invalidate_by_type() {
        let (manager, store, _) = seeded().await;
        let report = manager
            .invalidate(InvalidationScope::Type(CacheType::Trending))
            .await
            .expect("invalidate");
        assert_eq!(report.cleared_entries, 2);
        assert_eq!(report.cache_type, "trending");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_key_is_idempotent() {
        let (manager, _, key) = seeded().await;
        let first = manager.invalidate(InvalidationScope::Key(key.clone())).await.expect("invalidate");
        let second = manager.invalidate(InvalidationScope::Key(key)).await.expect("invalidate");
        assert_eq!(first.cleared_entries, 1);
        assert_eq!(second.cleared_entries, 0);
        assert_eq!(first.cache_type, "rawg:detail:10");
    }

    #[tokio::test]
    async fn test_unknown_tag_clears_nothing() {
        let (manager, store, _) = seeded().await;
        let report = manager.invalidate_tag("reviews").await.expect("invalidate");
        assert_eq!(report.cleared_entries, 0);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_selector_semantics() {
        let (manager, store, _) = seeded().await;
        let typed = manager.invalidate_selector(Some("game-detail")).await.expect("invalidate");
        assert_eq!(typed.cleared_entries, 1);
        assert_eq!(typed.cache_type, "game-detail");

        let unknown = manager.invalidate_selector(Some("bogus")).await.expect("invalidate");
        assert_eq!(unknown.cleared_entries, 2);
        assert_eq!(unknown.cache_type, "all");
        assert!(store.is_empty());

        let none = manager.invalidate_selector(None).await.expect("invalidate");
        assert_eq!(none.cleared_entries, 0);
        assert_eq!(none.cache_type, "all");
    }

    #[tokio::test]
    async fn test_key_str() {
        let (manager, store, _) = seeded().await;
        let garbage = manager.invalidate_key_str("not a key").await.expect("invalidate");
        assert_eq!(garbage.cleared_entries, 0);

        let report = manager.invalidate_key_str("rawg:detail:10").await.expect("invalidate");
        assert_eq!(report.cleared_entries, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = InvalidationReport::new("all".to_string(), 4);
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["clearedEntries"], 4);
        assert_eq!(value["cacheType"], "all");
        assert_eq!(value["message"], "Cleared 4 cache entries for all");
    }
}
