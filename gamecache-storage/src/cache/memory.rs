//! In-process cache store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use gamecache_core::{CacheEntry, CacheKey, CacheType, GameCacheResult, StorageError};

use super::traits::{CacheStats, CacheStore};

/// `HashMap` behind a `RwLock`. Guards are dropped before every return, so no
/// lock outlives a call.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> GameCacheResult<Option<CacheEntry>> {
        let entry = {
            let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
            entries.get(key).cloned()
        };
        match entry {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        Ok(entry)
    }

    async fn put(&self, mut entry: CacheEntry) -> GameCacheResult<CacheEntry> {
        entry.check_invariants()?;

        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        if let Some(existing) = entries.get(&entry.key) {
            entry.created_at = existing.created_at;
            entry.check_invariants()?;
        }
        entries.insert(entry.key.clone(), entry.clone());
        Ok(entry)
    }

    async fn delete_by_key(&self, key: &CacheKey) -> GameCacheResult<u64> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(u64::from(entries.remove(key).is_some()))
    }

    async fn delete_by_type(&self, cache_type: CacheType) -> GameCacheResult<u64> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|key, _| key.cache_type() != cache_type);
        Ok((before - entries.len()) as u64)
    }

    async fn delete_all(&self) -> GameCacheResult<u64> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let cleared = entries.len() as u64;
        entries.clear();
        Ok(cleared)
    }

    async fn stats(&self) -> GameCacheResult<CacheStats> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut entries_by_type = BTreeMap::new();
        for key in entries.keys() {
            *entries_by_type.entry(key.cache_type()).or_insert(0) += 1;
        }
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            entries_by_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gamecache_core::{build_key, GameCacheError, Provider, RequestParams, ResourceKind};
    use serde_json::json;

    fn entry(kind: ResourceKind, params: RequestParams, payload: serde_json::Value) -> CacheEntry {
        let (key, _) = build_key(Provider::Rawg, kind, &params).expect("valid key");
        CacheEntry::new(key, payload, Utc::now())
    }

    fn detail(id: u64) -> CacheEntry {
        entry(ResourceKind::Detail, RequestParams::new().with("id", id), json!({"id": id}))
    }

    fn trending(page: u64) -> CacheEntry {
        entry(ResourceKind::Trending, RequestParams::new().with("page", page), json!({"page": page}))
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryCacheStore::new();
        let stored = store.put(detail(1)).await.expect("put");
        let fetched = store.get(&stored.key).await.expect("get");
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn test_put_preserves_created_at() {
        let store = InMemoryCacheStore::new();
        let first = store.put(detail(1)).await.expect("put");

        let later = first.created_at + Duration::seconds(60);
        let second = CacheEntry::new(first.key.clone(), json!({"id": 1, "v": 2}), later);
        let stored = store.put(second).await.expect("put");

        assert_eq!(stored.created_at, first.created_at);
        assert_eq!(stored.refreshed_at, later);
        assert_eq!(stored.payload["v"], 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_refresh_before_creation() {
        let store = InMemoryCacheStore::new();
        let mut bad = detail(1);
        bad.refreshed_at = bad.created_at - Duration::seconds(1);
        let err = store.put(bad).await.unwrap_err();
        assert!(matches!(err, GameCacheError::Storage(StorageError::WriteRejected { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_rejects_type_that_disagrees_with_key() {
        let store = InMemoryCacheStore::new();
        let mut mislabeled = detail(1);
        mislabeled.cache_type = CacheType::Trending;
        let err = store.put(mislabeled).await.unwrap_err();
        assert!(matches!(err, GameCacheError::Storage(StorageError::WriteRejected { .. })));
        assert_eq!(store.delete_by_type(CacheType::Trending).await.expect("delete"), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_rejects_refresh_before_stored_creation() {
        let store = InMemoryCacheStore::new();
        let first = store.put(detail(1)).await.expect("put");

        let earlier = first.created_at - Duration::seconds(5);
        let stale_write = CacheEntry::new(first.key.clone(), json!({}), earlier);
        assert!(store.put(stale_write).await.is_err());
        assert_eq!(store.get(&first.key).await.expect("get"), Some(first));
    }

    #[tokio::test]
    async fn test_delete_by_key_reports_zero_or_one() {
        let store = InMemoryCacheStore::new();
        let stored = store.put(detail(1)).await.expect("put");
        assert_eq!(store.delete_by_key(&stored.key).await.expect("delete"), 1);
        assert_eq!(store.delete_by_key(&stored.key).await.expect("delete"), 0);
    }

    #[tokio::test]
    async fn test_delete_by_type_removes_exactly_matching() {
        let store = InMemoryCacheStore::new();
        for page in 1..=3 {
            store.put(trending(page)).await.expect("put");
        }
        store.put(detail(1)).await.expect("put");
        store.put(detail(2)).await.expect("put");

        assert_eq!(store.delete_by_type(CacheType::Trending).await.expect("delete"), 3);
        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.entries_by_type.get(&CacheType::GameDetail), Some(&2));
        assert_eq!(stats.entries_by_type.get(&CacheType::Trending), None);
    }

    #[tokio::test]
    async fn test_delete_all_returns_prior_count() {
        let store = InMemoryCacheStore::new();
        store.put(detail(1)).await.expect("put");
        store.put(trending(1)).await.expect("put");
        assert_eq!(store.delete_all().await.expect("delete"), 2);
        assert_eq!(store.delete_all().await.expect("delete"), 0);
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let store = InMemoryCacheStore::new();
        let stored = store.put(detail(1)).await.expect("put");
        let missing = detail(2);

        store.get(&stored.key).await.expect("get");
        store.get(&stored.key).await.expect("get");
        store.get(&missing.key).await.expect("get");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::{Duration, Utc};
    use gamecache_core::{build_key, Provider, RequestParams, ResourceKind};
    use proptest::prelude::*;

    fn json_strategy() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-z ]{0,12}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Whatever is put comes back unchanged, and timestamps stay ordered
        /// across rewrites.
        #[test]
        fn prop_put_get_round_trip(
            id in 1u64..10_000,
            first in json_strategy(),
            second in json_strategy(),
            gap_secs in 0i64..100_000,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime");
            rt.block_on(async {
                let store = InMemoryCacheStore::new();
                let (key, _) =
                    build_key(Provider::Igdb, ResourceKind::Detail, &RequestParams::new().with("id", id))
                        .expect("valid key");
                let t0 = Utc::now();

                let stored = store
                    .put(CacheEntry::new(key.clone(), first.clone(), t0))
                    .await
                    .expect("put");
                prop_assert_eq!(&stored.payload, &first);

                let t1 = t0 + Duration::seconds(gap_secs);
                let rewritten = store
                    .put(CacheEntry::new(key.clone(), second.clone(), t1))
                    .await
                    .expect("put");
                prop_assert!(rewritten.refreshed_at >= rewritten.created_at);
                prop_assert_eq!(rewritten.created_at, t0);

                let fetched = store.get(&key).await.expect("get").expect("present");
                prop_assert_eq!(fetched.payload, second);
                Ok(())
            })?;
        }
    }
}
