//! Cache store trait and statistics.

use std::collections::BTreeMap;

use async_trait::async_trait;
use gamecache_core::{CacheEntry, CacheKey, CacheType, GameCacheResult};
use serde::Serialize;

/// Persistence substrate for cache entries.
///
/// Implementations must be safe for concurrent use and make each mutation
/// atomic per entry: two racing `put`s on one key leave exactly one writer's
/// full entry. No implementation holds an in-process lock across an await.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry. Never modifies entries; hit and miss counters may
    /// change.
    async fn get(&self, key: &CacheKey) -> GameCacheResult<Option<CacheEntry>>;

    /// Insert or overwrite an entry and return it as stored.
    ///
    /// Overwrites payload, type and `refreshed_at`. An existing entry's
    /// `created_at` is kept. Entries with `refreshed_at < created_at` are
    /// rejected.
    async fn put(&self, entry: CacheEntry) -> GameCacheResult<CacheEntry>;

    /// Remove one entry. Returns 1 if it existed, else 0.
    async fn delete_by_key(&self, key: &CacheKey) -> GameCacheResult<u64>;

    /// Remove every entry of `cache_type`. Returns the number removed.
    async fn delete_by_type(&self, cache_type: CacheType) -> GameCacheResult<u64>;

    /// Remove every entry. Returns the number removed.
    async fn delete_all(&self) -> GameCacheResult<u64>;

    async fn stats(&self) -> GameCacheResult<CacheStats>;

    /// Reachability check for readiness probes.
    async fn ping(&self) -> GameCacheResult<()> {
        Ok(())
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of lookups that found an entry, fresh or stale.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Entry count per cache type. Types with no entries are omitted.
    pub entries_by_type: BTreeMap<CacheType, u64>,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_cache_stats_serializes_type_tags() {
        let stats = CacheStats {
            entry_count: 3,
            entries_by_type: [(CacheType::Trending, 3)].into_iter().collect(),
            ..Default::default()
        };
        let value = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(value["entryCount"], 3);
        assert_eq!(value["entriesByType"]["trending"], 3);
    }
}
