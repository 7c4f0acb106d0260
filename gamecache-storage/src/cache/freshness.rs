//! Read results carrying provenance and staleness metadata.

use std::fmt;
use std::time::Duration;

use gamecache_core::{CacheKey, CacheType, Timestamp};
use serde::{Deserialize, Serialize};

/// How a read was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    /// Served from a fresh cache entry.
    Hit,
    /// Fetched from the provider (miss, stale entry, forced refresh or bypass).
    Fetched,
    /// The provider failed and a stale entry was served instead.
    Degraded,
}

impl ReadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStatus::Hit => "hit",
            ReadStatus::Fetched => "fetched",
            ReadStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a read-through fetch.
///
/// Callers always learn whether the value came from the cache, from the
/// provider, or is a stale fallback, and how old it is.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    key: CacheKey,
    cache_type: CacheType,
    status: ReadStatus,
    /// When the value was last fetched from the provider.
    refreshed_at: Timestamp,
    /// Upstream failure message for degraded reads.
    warning: Option<String>,
}

impl<T> CacheRead<T> {
    pub fn from_cache(value: T, key: CacheKey, cache_type: CacheType, refreshed_at: Timestamp) -> Self {
        Self {
            value,
            key,
            cache_type,
            status: ReadStatus::Hit,
            refreshed_at,
            warning: None,
        }
    }

    pub fn fetched(value: T, key: CacheKey, cache_type: CacheType, refreshed_at: Timestamp) -> Self {
        Self {
            value,
            key,
            cache_type,
            status: ReadStatus::Fetched,
            refreshed_at,
            warning: None,
        }
    }

    pub fn degraded(
        value: T,
        key: CacheKey,
        cache_type: CacheType,
        refreshed_at: Timestamp,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            value,
            key,
            cache_type,
            status: ReadStatus::Degraded,
            refreshed_at,
            warning: Some(warning.into()),
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn cache_type(&self) -> CacheType {
        self.cache_type
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    pub fn refreshed_at(&self) -> Timestamp {
        self.refreshed_at
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn was_cache_hit(&self) -> bool {
        self.status == ReadStatus::Hit
    }

    pub fn is_degraded(&self) -> bool {
        self.status == ReadStatus::Degraded
    }

    /// Age of the value at `now`, zero if `now` precedes the refresh.
    pub fn staleness(&self, now: Timestamp) -> Duration {
        (now - self.refreshed_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            key: self.key,
            cache_type: self.cache_type,
            status: self.status,
            refreshed_at: self.refreshed_at,
            warning: self.warning,
        }
    }

    /// Fallible [`map`](Self::map).
    pub fn try_map<U, E, F>(self, f: F) -> Result<CacheRead<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(CacheRead {
            value: f(self.value)?,
            key: self.key,
            cache_type: self.cache_type,
            status: self.status,
            refreshed_at: self.refreshed_at,
            warning: self.warning,
        })
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
