//! Shared application state and backend selection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use deadpool_postgres::Pool;
use gamecache_core::{
    CacheBackendKind, CacheEntry, CacheKey, CacheSettings, CacheType, GameCacheError,
    GameCacheResult, OverlayRecord, ResourceId, ViewerId,
};
use gamecache_storage::{
    CacheStats, CacheStore, InMemoryCacheStore, InMemoryViewerStateStore, InvalidationManager,
    LmdbCacheStore, OverlayCompositor, ProviderRegistry, ReadThroughFetcher, TtlPolicy,
    ViewerStateStore,
};

use gamecache_providers::build_registry;

use crate::config::ServiceConfig;
use crate::db::ensure_schema;
use crate::error::{ApiError, ApiResult};
use crate::pg_store::{PgCacheStore, PgViewerStateStore};

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// The cache store selected at startup.
pub enum AnyCacheStore {
    Memory(InMemoryCacheStore),
    Lmdb(LmdbCacheStore),
    Postgres(PgCacheStore),
}

impl AnyCacheStore {
    /// Open the backend named in `settings`. The Postgres backend needs a pool.
    pub fn open(settings: &CacheSettings, pool: Option<&Pool>) -> ApiResult<Self> {
        let store = match settings.backend {
            CacheBackendKind::Memory => AnyCacheStore::Memory(InMemoryCacheStore::new()),
            CacheBackendKind::Lmdb => AnyCacheStore::Lmdb(
                LmdbCacheStore::new(&settings.lmdb_path, settings.lmdb_max_size_mb)
                    .map_err(GameCacheError::from)?,
            ),
            CacheBackendKind::Postgres => {
                let pool = pool.ok_or_else(|| {
                    ApiError::internal_error("postgres cache backend selected without a pool")
                })?;
                AnyCacheStore::Postgres(PgCacheStore::new(pool.clone()))
            }
        };
        tracing::info!(backend = %store.backend(), "Cache store opened");
        Ok(store)
    }

    pub fn backend(&self) -> CacheBackendKind {
        match self {
            AnyCacheStore::Memory(_) => CacheBackendKind::Memory,
            AnyCacheStore::Lmdb(_) => CacheBackendKind::Lmdb,
            AnyCacheStore::Postgres(_) => CacheBackendKind::Postgres,
        }
    }
}

#[async_trait]
impl CacheStore for AnyCacheStore {
    async fn get(&self, key: &CacheKey) -> GameCacheResult<Option<CacheEntry>> {
        match self {
            AnyCacheStore::Memory(s) => s.get(key).await,
            AnyCacheStore::Lmdb(s) => s.get(key).await,
            AnyCacheStore::Postgres(s) => s.get(key).await,
        }
    }

    async fn put(&self, entry: CacheEntry) -> GameCacheResult<CacheEntry> {
        match self {
            AnyCacheStore::Memory(s) => s.put(entry).await,
            AnyCacheStore::Lmdb(s) => s.put(entry).await,
            AnyCacheStore::Postgres(s) => s.put(entry).await,
        }
    }

    async fn delete_by_key(&self, key: &CacheKey) -> GameCacheResult<u64> {
        match self {
            AnyCacheStore::Memory(s) => s.delete_by_key(key).await,
            AnyCacheStore::Lmdb(s) => s.delete_by_key(key).await,
            AnyCacheStore::Postgres(s) => s.delete_by_key(key).await,
        }
    }

    async fn delete_by_type(&self, cache_type: CacheType) -> GameCacheResult<u64> {
        match self {
            AnyCacheStore::Memory(s) => s.delete_by_type(cache_type).await,
            AnyCacheStore::Lmdb(s) => s.delete_by_type(cache_type).await,
            AnyCacheStore::Postgres(s) => s.delete_by_type(cache_type).await,
        }
    }

    async fn delete_all(&self) -> GameCacheResult<u64> {
        match self {
            AnyCacheStore::Memory(s) => s.delete_all().await,
            AnyCacheStore::Lmdb(s) => s.delete_all().await,
            AnyCacheStore::Postgres(s) => s.delete_all().await,
        }
    }

    async fn stats(&self) -> GameCacheResult<CacheStats> {
        match self {
            AnyCacheStore::Memory(s) => s.stats().await,
            AnyCacheStore::Lmdb(s) => s.stats().await,
            AnyCacheStore::Postgres(s) => s.stats().await,
        }
    }

    async fn ping(&self) -> GameCacheResult<()> {
        match self {
            AnyCacheStore::Memory(s) => s.ping().await,
            AnyCacheStore::Lmdb(s) => s.ping().await,
            AnyCacheStore::Postgres(s) => s.ping().await,
        }
    }
}

// ============================================================================
// VIEWER STATE BACKEND
// ============================================================================

/// Where viewer list state is read from.
pub enum AnyViewerStateStore {
    Memory(InMemoryViewerStateStore),
    Postgres(PgViewerStateStore),
}

impl AnyViewerStateStore {
    /// Postgres when a pool is available, otherwise an empty in-process store.
    pub fn open(pool: Option<&Pool>) -> Self {
        match pool {
            Some(pool) => AnyViewerStateStore::Postgres(PgViewerStateStore::new(pool.clone())),
            None => AnyViewerStateStore::Memory(InMemoryViewerStateStore::new()),
        }
    }
}

#[async_trait]
impl ViewerStateStore for AnyViewerStateStore {
    async fn get_states_for_resources(
        &self,
        viewer: ViewerId,
        ids: &[ResourceId],
    ) -> GameCacheResult<HashMap<ResourceId, OverlayRecord>> {
        match self {
            AnyViewerStateStore::Memory(s) => s.get_states_for_resources(viewer, ids).await,
            AnyViewerStateStore::Postgres(s) => s.get_states_for_resources(viewer, ids).await,
        }
    }
}

// ============================================================================
// APP STATE
// ============================================================================

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: ReadThroughFetcher<AnyCacheStore>,
    pub compositor: OverlayCompositor<AnyViewerStateStore>,
    pub invalidation: InvalidationManager<AnyCacheStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<AnyCacheStore>,
        viewer_states: Arc<AnyViewerStateStore>,
        providers: Arc<ProviderRegistry>,
        ttl: Arc<TtlPolicy>,
    ) -> Self {
        Self {
            fetcher: ReadThroughFetcher::new(store.clone(), providers, ttl),
            compositor: OverlayCompositor::new(viewer_states),
            invalidation: InvalidationManager::new(store),
            start_time: Instant::now(),
        }
    }

    /// Wire stores, providers and the TTL table from validated configuration.
    pub async fn from_config(config: &ServiceConfig) -> ApiResult<Self> {
        let pool = match &config.db {
            Some(db) => {
                let pool = db.create_pool()?;
                ensure_schema(&pool).await?;
                Some(pool)
            }
            None => None,
        };

        let store = Arc::new(AnyCacheStore::open(&config.cache, pool.as_ref())?);
        let viewer_states = Arc::new(AnyViewerStateStore::open(pool.as_ref()));
        let providers = Arc::new(build_registry(&config.providers)?);
        if providers.is_empty() {
            tracing::warn!("No providers configured; only cached entries can be served");
        }
        let ttl = Arc::new(TtlPolicy::from_settings(&config.cache)?);

        Ok(Self::new(store, viewer_states, providers, ttl))
    }

    pub fn store(&self) -> &Arc<AnyCacheStore> {
        self.fetcher.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gamecache_core::{build_key, Provider, RequestParams, ResourceKind};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_open_memory_backend() {
        let store = AnyCacheStore::open(&CacheSettings::default(), None).expect("memory store");
        assert_eq!(store.backend(), CacheBackendKind::Memory);
    }

    #[test]
    fn test_postgres_backend_requires_pool() {
        let settings = CacheSettings {
            backend: CacheBackendKind::Postgres,
            ..CacheSettings::default()
        };
        assert!(AnyCacheStore::open(&settings, None).is_err());
    }

    #[tokio::test]
    async fn test_lmdb_backend_dispatches() {
        let dir = TempDir::new().expect("TempDir creation should succeed");
        let settings = CacheSettings {
            backend: CacheBackendKind::Lmdb,
            lmdb_path: dir.path().join("cache"),
            lmdb_max_size_mb: 10,
            ..CacheSettings::default()
        };
        let store = AnyCacheStore::open(&settings, None).expect("lmdb store");
        assert_eq!(store.backend(), CacheBackendKind::Lmdb);

        let (key, _) = build_key(
            Provider::Igdb,
            ResourceKind::Detail,
            &RequestParams::new().with("id", 7),
        )
        .expect("key");
        store
            .put(CacheEntry::new(key.clone(), json!({"id": 7}), Utc::now()))
            .await
            .expect("put");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.entry_count, 1);
        assert_eq!(store.delete_all().await.expect("delete all"), 1);
        assert!(store.get(&key).await.expect("get").is_none());
        store.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn test_memory_viewer_store_without_pool() {
        let viewer_states = AnyViewerStateStore::open(None);
        let states = viewer_states
            .get_states_for_resources(ViewerId::new(uuid::Uuid::now_v7()), &[ResourceId::rawg(1)])
            .await
            .expect("lookup");
        assert!(states.is_empty());
    }
}
