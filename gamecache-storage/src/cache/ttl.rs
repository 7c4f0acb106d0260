//! Per-type expiry policy.

use std::collections::HashMap;
use std::time::Duration;

use gamecache_core::{ttl_env_var, CacheEntry, CacheSettings, CacheType, ConfigError, Timestamp};

/// Exhaustive `CacheType -> Duration` table, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    ttls: HashMap<CacheType, Duration>,
}

impl TtlPolicy {
    /// Build a policy. Fails if any cache type lacks a duration.
    pub fn new<I>(ttls: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (CacheType, Duration)>,
    {
        let ttls: HashMap<CacheType, Duration> = ttls.into_iter().collect();
        for cache_type in CacheType::ALL {
            if !ttls.contains_key(&cache_type) {
                return Err(missing(cache_type));
            }
        }
        Ok(Self { ttls })
    }

    pub fn from_settings(settings: &CacheSettings) -> Result<Self, ConfigError> {
        Self::new(settings.ttls.iter().map(|(t, d)| (*t, *d)))
    }

    /// Every type gets the same duration.
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            ttls: CacheType::ALL.iter().map(|t| (*t, ttl)).collect(),
        }
    }

    pub fn duration(&self, cache_type: CacheType) -> Result<Duration, ConfigError> {
        self.ttls
            .get(&cache_type)
            .copied()
            .ok_or_else(|| missing(cache_type))
    }

    /// Fresh iff `now - refreshed_at < ttl`. Equality is stale, so a zero TTL
    /// is always stale. An entry refreshed in the future has zero age.
    pub fn is_fresh(&self, entry: &CacheEntry, now: Timestamp) -> Result<bool, ConfigError> {
        let ttl = self.duration(entry.cache_type)?;
        Ok(self.age(entry, now) < ttl)
    }

    /// When the entry stops being fresh.
    pub fn expires_at(&self, entry: &CacheEntry) -> Result<Timestamp, ConfigError> {
        let ttl = self.duration(entry.cache_type)?;
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| ConfigError::InvalidValue {
            field: ttl_env_var(entry.cache_type),
            value: format!("{:?}", ttl),
            reason: "duration out of range".to_string(),
        })?;
        entry
            .refreshed_at
            .checked_add_signed(ttl)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: ttl_env_var(entry.cache_type),
                value: format!("{}", ttl),
                reason: "expiry overflows the calendar".to_string(),
            })
    }

    /// Time since the last refresh, zero if `now` precedes it.
    pub fn age(&self, entry: &CacheEntry, now: Timestamp) -> Duration {
        (now - entry.refreshed_at).to_std().unwrap_or(Duration::ZERO)
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttls: CacheType::ALL
                .iter()
                .map(|t| (*t, gamecache_core::default_ttl(*t)))
                .collect(),
        }
    }
}

fn missing(cache_type: CacheType) -> ConfigError {
    ConfigError::MissingRequired {
        field: ttl_env_var(cache_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gamecache_core::{build_key, Provider, RequestParams, ResourceKind};

    fn entry_at(kind: ResourceKind, params: RequestParams, at: Timestamp) -> CacheEntry {
        let (key, _) = build_key(Provider::Rawg, kind, &params).expect("valid key");
        CacheEntry::new(key, serde_json::json!({}), at)
    }

    fn detail_at(at: Timestamp) -> CacheEntry {
        entry_at(ResourceKind::Detail, RequestParams::new().with("id", 1042), at)
    }

    #[test]
    fn test_new_fails_fast_on_missing_type() {
        let partial = CacheType::ALL
            .iter()
            .filter(|t| **t != CacheType::Videos)
            .map(|t| (*t, Duration::from_secs(60)));
        assert_eq!(
            TtlPolicy::new(partial),
            Err(ConfigError::MissingRequired {
                field: "GAMECACHE_TTL_VIDEOS_SECS".to_string()
            })
        );
    }

    #[test]
    fn test_freshness_boundary_is_strict() {
        let policy = TtlPolicy::uniform(Duration::from_secs(3600));
        let t0 = Utc::now();
        let entry = detail_at(t0);

        assert_eq!(policy.is_fresh(&entry, t0 + chrono::Duration::seconds(3599)), Ok(true));
        assert_eq!(policy.is_fresh(&entry, t0 + chrono::Duration::seconds(3600)), Ok(false));
        assert_eq!(policy.is_fresh(&entry, t0 + chrono::Duration::seconds(3601)), Ok(false));
    }

    #[test]
    fn test_zero_ttl_is_always_stale() {
        let policy = TtlPolicy::uniform(Duration::ZERO);
        let t0 = Utc::now();
        assert_eq!(policy.is_fresh(&detail_at(t0), t0), Ok(false));
    }

    #[test]
    fn test_future_refresh_counts_as_fresh() {
        let policy = TtlPolicy::uniform(Duration::from_secs(10));
        let t0 = Utc::now();
        let entry = detail_at(t0 + chrono::Duration::seconds(30));
        assert_eq!(policy.age(&entry, t0), Duration::ZERO);
        assert_eq!(policy.is_fresh(&entry, t0), Ok(true));
    }

    #[test]
    fn test_types_use_their_own_ttl() {
        let policy = TtlPolicy::default();
        let t0 = Utc::now();
        let two_hours = t0 + chrono::Duration::hours(2);

        let search = entry_at(ResourceKind::Search, RequestParams::new().with("q", "doom"), t0);
        assert_eq!(policy.is_fresh(&search, two_hours), Ok(false));
        assert_eq!(policy.is_fresh(&detail_at(t0), two_hours), Ok(true));
    }

    #[test]
    fn test_expires_at_and_age() {
        let policy = TtlPolicy::uniform(Duration::from_secs(90));
        let t0 = Utc::now();
        let entry = detail_at(t0);
        assert_eq!(policy.expires_at(&entry), Ok(t0 + chrono::Duration::seconds(90)));
        assert_eq!(
            policy.age(&entry, t0 + chrono::Duration::seconds(12)),
            Duration::from_secs(12)
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = CacheSettings::default().with_ttl(CacheType::Trending, Duration::from_secs(5));
        let policy = TtlPolicy::from_settings(&settings).expect("complete table");
        assert_eq!(policy.duration(CacheType::Trending), Ok(Duration::from_secs(5)));
    }
}
