//! Read-through cache for upstream game metadata.
//!
//! A request for a provider resource is turned into a canonical [`CacheKey`]
//! and served from a [`CacheStore`] while the stored entry is younger than the
//! TTL of its [`CacheType`](gamecache_core::CacheType). Stale or missing
//! entries are refetched through the provider's [`ProviderAdapter`] and
//! written back.
//!
//! # Staleness
//!
//! Reads return [`CacheRead<T>`], which says whether the value was a fresh
//! hit, a new fetch, or a stale entry served because the provider failed.
//! Callers can inspect [`CacheRead::staleness`] instead of guessing.
//!
//! # Viewer State
//!
//! Cached payloads are viewer-independent. Per-viewer list status and rating
//! are merged on the way out by [`OverlayCompositor`] and never stored.
//!
//! # Example
//!
//! ```ignore
//! let fetcher = ReadThroughFetcher::new(store, providers, ttl);
//! let read = fetcher
//!     .fetch_as::<GameDetail>(Provider::Rawg, ResourceKind::Detail, &params, FetchOptions::default())
//!     .await?;
//!
//! if read.is_degraded() {
//!     tracing::warn!(key = %read.key(), "serving stale detail");
//! }
//! ```

pub mod clock;
pub mod freshness;
pub mod invalidation;
pub mod keys;
pub mod lmdb_backend;
pub mod memory;
pub mod overlay;
pub mod read_through;
pub mod traits;
pub mod ttl;
pub mod upstream;

pub use clock::{Clock, ManualClock, SystemClock};
pub use freshness::{CacheRead, ReadStatus};
pub use invalidation::{InvalidationManager, InvalidationReport, InvalidationScope};
pub use keys::{build_key, CacheKey, StoreKey, DEFAULT_PAGE_SIZE, MAX_INLINE_KEY_LEN, MAX_PAGE_SIZE};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use overlay::{InMemoryViewerStateStore, OverlayCompositor, ViewerStateStore};
pub use read_through::{FetchOptions, FetcherStats, ReadThroughFetcher};
pub use traits::{CacheStats, CacheStore};
pub use ttl::TtlPolicy;
pub use upstream::{ProviderAdapter, ProviderRegistry};
