//! gamecache storage - cache stores, read-through fetching and overlays.
//!
//! Storage seams ([`CacheStore`], [`ViewerStateStore`], [`ProviderAdapter`])
//! live here together with the in-memory and LMDB stores. The Postgres
//! implementations live in gamecache-api.

pub mod cache;

pub use cache::{
    build_key, CacheKey, CacheRead, CacheStats, CacheStore, Clock, FetchOptions, FetcherStats,
    InMemoryCacheStore, InMemoryViewerStateStore, InvalidationManager, InvalidationReport,
    InvalidationScope, LmdbCacheError, LmdbCacheStore, ManualClock, OverlayCompositor,
    ProviderAdapter, ProviderRegistry, ReadStatus, ReadThroughFetcher, StoreKey, SystemClock,
    TtlPolicy, ViewerStateStore,
};
