//! Read-through fetcher.
//!
//! Serves fresh cache entries, refreshes stale or missing ones from the
//! provider, and falls back to a stale entry when the provider fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gamecache_core::{
    build_key, CacheEntry, CacheKey, GameCacheError, GameCacheResult, Provider, ProviderError,
    RequestParams, ResourceKind, StorageError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::freshness::CacheRead;
use super::traits::CacheStore;
use super::ttl::TtlPolicy;
use super::upstream::ProviderRegistry;

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Call the provider even if a fresh entry exists, then store the result.
    pub force_refresh: bool,
    /// Call the provider without reading or writing the store.
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set force_refresh.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// Set bypass_cache.
    pub fn with_bypass_cache(mut self, bypass_cache: bool) -> Self {
        self.bypass_cache = bypass_cache;
        self
    }
}

/// Snapshot of fetcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherStats {
    /// Fresh entries served.
    pub hits: u64,
    /// Lookups that found no entry.
    pub misses: u64,
    /// Stale or force-refreshed entries sent upstream.
    pub refreshes: u64,
    /// Stale entries served after a provider failure.
    pub degraded: u64,
    /// Provider calls that failed.
    pub upstream_failures: u64,
}

#[derive(Debug, Default)]
struct FetcherCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    degraded: AtomicU64,
    upstream_failures: AtomicU64,
}

impl FetcherCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FetcherStats {
        FetcherStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Read-through fetcher over a cache store and a set of provider adapters.
///
/// # Type Parameters
///
/// - `S`: the cache store
/// - `C`: the clock used for freshness decisions and timestamps
///
/// No single-flight: concurrent misses on one key may each call the provider,
/// and the last `put` wins.
pub struct ReadThroughFetcher<S, C = SystemClock>
where
    S: CacheStore,
    C: Clock,
{
    store: Arc<S>,
    providers: Arc<ProviderRegistry>,
    ttl: Arc<TtlPolicy>,
    clock: Arc<C>,
    counters: Arc<FetcherCounters>,
}

impl<S: CacheStore> ReadThroughFetcher<S, SystemClock> {
    pub fn new(store: Arc<S>, providers: Arc<ProviderRegistry>, ttl: Arc<TtlPolicy>) -> Self {
        Self::with_clock(store, providers, ttl, Arc::new(SystemClock))
    }
}

impl<S, C> ReadThroughFetcher<S, C>
where
    S: CacheStore,
    C: Clock,
{
    pub fn with_clock(
        store: Arc<S>,
        providers: Arc<ProviderRegistry>,
        ttl: Arc<TtlPolicy>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            providers,
            ttl,
            clock,
            counters: Arc::new(FetcherCounters::default()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn stats(&self) -> FetcherStats {
        self.counters.snapshot()
    }

    /// Fetch a resource through the cache.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when the key cannot be built
    /// - `UpstreamFetch` when the provider fails and there is no entry to fall
    ///   back on, or no adapter is registered for `provider`
    /// - `Storage` when the store lookup fails
    pub async fn fetch(
        &self,
        provider: Provider,
        kind: ResourceKind,
        params: &RequestParams,
        options: FetchOptions,
    ) -> GameCacheResult<CacheRead<serde_json::Value>> {
        let (key, cache_type) = build_key(provider, kind, params)?;

        if options.bypass_cache {
            let payload = self
                .call_upstream(&key)
                .await
                .map_err(|e| GameCacheError::upstream(provider, e))?;
            debug!(key = %key, "cache bypassed");
            return Ok(CacheRead::fetched(payload, key, cache_type, self.clock.now()));
        }

        let existing = self.store.get(&key).await?;
        match &existing {
            Some(entry) if !options.force_refresh && self.ttl.is_fresh(entry, self.clock.now())? => {
                FetcherCounters::bump(&self.counters.hits);
                debug!(key = %key, "cache hit");
                return Ok(CacheRead::from_cache(
                    entry.payload.clone(),
                    key,
                    cache_type,
                    entry.refreshed_at,
                ));
            }
            Some(_) => {
                FetcherCounters::bump(&self.counters.refreshes);
                debug!(key = %key, force = options.force_refresh, "cache entry stale, refreshing");
            }
            None => {
                FetcherCounters::bump(&self.counters.misses);
                debug!(key = %key, "cache miss");
            }
        }

        match self.call_upstream(&key).await {
            Ok(payload) => {
                let now = self.clock.now();
                let entry = match existing {
                    Some(previous) => previous.refreshed(payload, now),
                    None => CacheEntry::new(key.clone(), payload, now),
                };
                let payload = entry.payload.clone();
                match self.store.put(entry).await {
                    Ok(stored) => Ok(CacheRead::fetched(
                        stored.payload,
                        key,
                        cache_type,
                        stored.refreshed_at,
                    )),
                    Err(err) => {
                        warn!(key = %key, error = %err, "cache write failed, serving fresh payload uncached");
                        Ok(CacheRead::fetched(payload, key, cache_type, now))
                    }
                }
            }
            Err(err) => match existing {
                Some(entry) => {
                    FetcherCounters::bump(&self.counters.degraded);
                    warn!(key = %key, error = %err, "provider failed, serving stale entry");
                    Ok(CacheRead::degraded(
                        entry.payload,
                        key,
                        cache_type,
                        entry.refreshed_at,
                        err.to_string(),
                    ))
                }
                None => Err(GameCacheError::upstream(provider, err)),
            },
        }
    }

    /// [`fetch`](Self::fetch), deserializing the payload into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        provider: Provider,
        kind: ResourceKind,
        params: &RequestParams,
        options: FetchOptions,
    ) -> GameCacheResult<CacheRead<T>> {
        let read = self.fetch(provider, kind, params, options).await?;
        read.try_map(serde_json::from_value).map_err(|e| {
            GameCacheError::from(StorageError::Serialization {
                reason: e.to_string(),
            })
        })
    }

    async fn call_upstream(&self, key: &CacheKey) -> Result<serde_json::Value, ProviderError> {
        let result = match self.providers.require(key.provider()) {
            Ok(adapter) => adapter.fetch(key.kind(), key.params()).await,
            Err(err) => Err(err),
        };
        if result.is_err() {
            FetcherCounters::bump(&self.counters.upstream_failures);
        }
        result
    }
}

impl<S, C> Clone for ReadThroughFetcher<S, C>
where
    S: CacheStore,
    C: Clock,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            providers: Arc::clone(&self.providers),
            ttl: Arc::clone(&self.ttl),
            clock: Arc::clone(&self.clock),
            counters: Arc::clone(&self.counters),
        }
    }
}
