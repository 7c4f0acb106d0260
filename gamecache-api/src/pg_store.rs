//! PostgreSQL-backed cache and viewer-state stores.
//!
//! Every mutation is a single statement, so per-entry atomicity comes from
//! PostgreSQL itself. The cache upsert never touches `created_at` on
//! conflict.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool, PoolError};
use gamecache_core::{
    CacheEntry, CacheKey, CacheType, GameCacheResult, ListStatus, OverlayRecord, Provider, Rating,
    ResourceId, StorageError, ViewerId,
};
use gamecache_storage::{CacheStats, CacheStore, ViewerStateStore};
use tokio_postgres::Row;

const SELECT_ENTRY_SQL: &str =
    "SELECT key, cache_type, payload, created_at, refreshed_at FROM game_cache WHERE key = $1";

const UPSERT_ENTRY_SQL: &str = r#"
INSERT INTO game_cache (key, cache_type, payload, created_at, refreshed_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (key) DO UPDATE
    SET cache_type = EXCLUDED.cache_type,
        payload = EXCLUDED.payload,
        refreshed_at = EXCLUDED.refreshed_at
    WHERE game_cache.created_at <= EXCLUDED.refreshed_at
RETURNING key, cache_type, payload, created_at, refreshed_at
"#;

fn pool_error(err: PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);
    StorageError::Unavailable {
        reason: err.to_string(),
    }
}

fn query_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);
    if err.is_closed() {
        StorageError::Unavailable {
            reason: err.to_string(),
        }
    } else {
        StorageError::TransactionFailed {
            reason: err.to_string(),
        }
    }
}

fn decode_error(what: &str, reason: impl std::fmt::Display) -> StorageError {
    StorageError::Serialization {
        reason: format!("undecodable {}: {}", what, reason),
    }
}

fn decode_entry(row: &Row) -> Result<CacheEntry, StorageError> {
    let raw_key: String = row.try_get("key").map_err(query_error)?;
    let raw_type: String = row.try_get("cache_type").map_err(query_error)?;

    Ok(CacheEntry {
        key: CacheKey::parse(&raw_key).map_err(|e| decode_error("cache key", e))?,
        cache_type: raw_type
            .parse::<CacheType>()
            .map_err(|e| decode_error("cache type", e))?,
        payload: row.try_get("payload").map_err(query_error)?,
        created_at: row.try_get("created_at").map_err(query_error)?,
        refreshed_at: row.try_get("refreshed_at").map_err(query_error)?,
    })
}

// ============================================================================
// CACHE STORE
// ============================================================================

/// Cache entries in the `game_cache` table.
pub struct PgCacheStore {
    pool: Pool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PgCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> Result<Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &CacheKey) -> GameCacheResult<Option<CacheEntry>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(SELECT_ENTRY_SQL, &[&key.as_str()])
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(decode_entry(&row)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: CacheEntry) -> GameCacheResult<CacheEntry> {
        entry.check_invariants()?;

        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                UPSERT_ENTRY_SQL,
                &[
                    &entry.key.as_str(),
                    &entry.cache_type.as_str(),
                    &entry.payload,
                    &entry.created_at,
                    &entry.refreshed_at,
                ],
            )
            .await
            .map_err(query_error)?;

        // The conflict branch filters out writes older than the stored entry.
        let row = row.ok_or_else(|| StorageError::WriteRejected {
            key: entry.key.to_string(),
            reason: "refreshedAt precedes the stored createdAt".to_string(),
        })?;
        Ok(decode_entry(&row)?)
    }

    async fn delete_by_key(&self, key: &CacheKey) -> GameCacheResult<u64> {
        let conn = self.conn().await?;
        let removed = conn
            .execute("DELETE FROM game_cache WHERE key = $1", &[&key.as_str()])
            .await
            .map_err(query_error)?;
        Ok(removed)
    }

    async fn delete_by_type(&self, cache_type: CacheType) -> GameCacheResult<u64> {
        let conn = self.conn().await?;
        let removed = conn
            .execute(
                "DELETE FROM game_cache WHERE cache_type = $1",
                &[&cache_type.as_str()],
            )
            .await
            .map_err(query_error)?;
        Ok(removed)
    }

    async fn delete_all(&self) -> GameCacheResult<u64> {
        let conn = self.conn().await?;
        let removed = conn
            .execute("DELETE FROM game_cache", &[])
            .await
            .map_err(query_error)?;
        Ok(removed)
    }

    async fn stats(&self) -> GameCacheResult<CacheStats> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT cache_type, COUNT(*) AS entries FROM game_cache GROUP BY cache_type",
                &[],
            )
            .await
            .map_err(query_error)?;

        let mut entries_by_type = BTreeMap::new();
        for row in rows {
            let raw_type: String = row.try_get("cache_type").map_err(query_error)?;
            let count: i64 = row.try_get("entries").map_err(query_error)?;
            match raw_type.parse::<CacheType>() {
                Ok(cache_type) => {
                    entries_by_type.insert(cache_type, count.max(0) as u64);
                }
                Err(_) => tracing::warn!(cache_type = %raw_type, "unknown cache type in game_cache"),
            }
        }

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries_by_type.values().sum(),
            entries_by_type,
        })
    }

    async fn ping(&self) -> GameCacheResult<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_error)?;
        Ok(())
    }
}

// ============================================================================
// VIEWER STATE STORE
// ============================================================================

/// Viewer list state in the `viewer_game_state` table.
#[derive(Clone)]
pub struct PgViewerStateStore {
    pool: Pool,
}

impl PgViewerStateStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Insert or replace the viewer's record for one game.
    pub async fn upsert(&self, viewer: ViewerId, record: &OverlayRecord) -> GameCacheResult<()> {
        let game_id = db_game_id(record.resource_id)?;
        let rating = record.rating.map(|r| i16::from(r.value()));

        let conn = self.conn().await?;
        conn.execute(
            r#"
            INSERT INTO viewer_game_state (viewer_id, provider, game_id, status, rating)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (viewer_id, provider, game_id) DO UPDATE
                SET status = EXCLUDED.status,
                    rating = EXCLUDED.rating,
                    updated_at = now()
            "#,
            &[
                &viewer.as_uuid(),
                &record.resource_id.provider.as_str(),
                &game_id,
                &record.status.as_db_str(),
                &rating,
            ],
        )
        .await
        .map_err(query_error)?;
        Ok(())
    }

    /// Remove the viewer's record for one game. Returns whether it existed.
    pub async fn remove(&self, viewer: ViewerId, id: ResourceId) -> GameCacheResult<bool> {
        let game_id = db_game_id(id)?;
        let conn = self.conn().await?;
        let removed = conn
            .execute(
                "DELETE FROM viewer_game_state WHERE viewer_id = $1 AND provider = $2 AND game_id = $3",
                &[&viewer.as_uuid(), &id.provider.as_str(), &game_id],
            )
            .await
            .map_err(query_error)?;
        Ok(removed > 0)
    }
}

fn db_game_id(id: ResourceId) -> Result<i64, StorageError> {
    i64::try_from(id.id).map_err(|_| StorageError::WriteRejected {
        key: id.to_string(),
        reason: "game id exceeds BIGINT".to_string(),
    })
}

fn decode_record(row: &Row) -> Result<OverlayRecord, StorageError> {
    let provider: String = row.try_get("provider").map_err(query_error)?;
    let game_id: i64 = row.try_get("game_id").map_err(query_error)?;
    let status: String = row.try_get("status").map_err(query_error)?;
    let rating: Option<i16> = row.try_get("rating").map_err(query_error)?;

    let provider = provider
        .parse::<Provider>()
        .map_err(|e| decode_error("provider", e))?;
    let id = u64::try_from(game_id).map_err(|e| decode_error("game id", e))?;
    let rating = rating
        .map(|r| {
            u8::try_from(r)
                .map_err(|e| decode_error("rating", e))
                .and_then(|r| Rating::new(r).map_err(|e| decode_error("rating", e)))
        })
        .transpose()?;

    Ok(OverlayRecord {
        resource_id: ResourceId::new(provider, id),
        status: ListStatus::from_db_str(&status).map_err(|e| decode_error("list status", e))?,
        rating,
    })
}

#[async_trait]
impl ViewerStateStore for PgViewerStateStore {
    async fn get_states_for_resources(
        &self,
        viewer: ViewerId,
        ids: &[ResourceId],
    ) -> GameCacheResult<HashMap<ResourceId, OverlayRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let wanted: HashSet<ResourceId> = ids.iter().copied().collect();
        let game_ids: Vec<i64> = ids.iter().filter_map(|id| i64::try_from(id.id).ok()).collect();

        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT provider, game_id, status, rating FROM viewer_game_state \
                 WHERE viewer_id = $1 AND game_id = ANY($2)",
                &[&viewer.as_uuid(), &game_ids],
            )
            .await
            .map_err(query_error)?;

        let mut states = HashMap::with_capacity(rows.len());
        for row in rows {
            let record = decode_record(&row)?;
            // Ids overlap across providers; keep only the requested pairs.
            if wanted.contains(&record.resource_id) {
                states.insert(record.resource_id, record);
            }
        }
        Ok(states)
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, DbConfig};
    use chrono::{Duration, TimeZone, Utc};
    use gamecache_core::{build_key, ResourceKind, RequestParams};
    use serde_json::json;
    use uuid::Uuid;

    async fn pool() -> Pool {
        let config = {
            let _lock = crate::test_env::lock_env();
            DbConfig::from_env().expect("db config")
        };
        let pool = config.create_pool().expect("pool");
        ensure_schema(&pool).await.expect("schema");
        pool
    }

    /// A detail key no other test run will collide with.
    fn unique_key() -> (CacheKey, CacheType) {
        let id = Uuid::now_v7().as_u128() as u64 >> 1;
        build_key(
            Provider::Rawg,
            ResourceKind::Detail,
            &RequestParams::new().with("id", id),
        )
        .expect("key")
    }

    #[tokio::test]
    async fn test_put_preserves_created_at() {
        let store = PgCacheStore::new(pool().await);
        let (key, _) = unique_key();
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("instant");

        let first = store
            .put(CacheEntry::new(key.clone(), json!({"v": 1}), t0))
            .await
            .expect("first put");
        assert_eq!(first.created_at, t0);

        let later = t0 + Duration::hours(3);
        let second = store
            .put(CacheEntry::new(key.clone(), json!({"v": 2}), later))
            .await
            .expect("second put");
        assert_eq!(second.created_at, t0);
        assert_eq!(second.refreshed_at, later);
        assert_eq!(second.payload, json!({"v": 2}));

        let stored = store.get(&key).await.expect("get").expect("present");
        assert_eq!(stored, second);

        assert_eq!(store.delete_by_key(&key).await.expect("delete"), 1);
        assert_eq!(store.delete_by_key(&key).await.expect("delete again"), 0);
    }

    #[tokio::test]
    async fn test_put_rejects_refresh_before_created() {
        let store = PgCacheStore::new(pool().await);
        let (key, _) = unique_key();
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("instant");

        store
            .put(CacheEntry::new(key.clone(), json!({}), t0))
            .await
            .expect("first put");
        let result = store
            .put(CacheEntry::new(key.clone(), json!({}), t0 - Duration::hours(1)))
            .await;
        assert!(result.is_err());

        store.delete_by_key(&key).await.expect("cleanup");
    }

    #[tokio::test]
    async fn test_viewer_states_round_trip() {
        let viewer_states = PgViewerStateStore::new(pool().await);
        let viewer = ViewerId::new(Uuid::now_v7());
        let record = OverlayRecord {
            resource_id: ResourceId::rawg(42),
            status: ListStatus::Completed,
            rating: Some(Rating::new(9).expect("rating")),
        };
        viewer_states.upsert(viewer, &record).await.expect("upsert");

        let states = viewer_states
            .get_states_for_resources(viewer, &[ResourceId::rawg(42), ResourceId::igdb(42)])
            .await
            .expect("lookup");
        assert_eq!(states.len(), 1);
        assert_eq!(states.get(&ResourceId::rawg(42)), Some(&record));

        assert!(viewer_states
            .remove(viewer, ResourceId::rawg(42))
            .await
            .expect("remove"));
    }

    #[tokio::test]
    async fn test_ping() {
        let store = PgCacheStore::new(pool().await);
        store.ping().await.expect("ping");
    }
}
