//! Configuration types

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::CacheType;
use crate::error::ConfigError;

/// Which `CacheStore` implementation backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Lmdb,
    Postgres,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackendKind::Memory => "memory",
            CacheBackendKind::Lmdb => "lmdb",
            CacheBackendKind::Postgres => "postgres",
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(CacheBackendKind::Memory),
            "lmdb" => Ok(CacheBackendKind::Lmdb),
            "postgres" | "postgresql" | "pg" => Ok(CacheBackendKind::Postgres),
            other => Err(ConfigError::InvalidValue {
                field: "GAMECACHE_CACHE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected memory, lmdb or postgres".to_string(),
            }),
        }
    }
}

/// Default time-to-live for a cache type.
pub fn default_ttl(cache_type: CacheType) -> Duration {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    let secs = match cache_type {
        CacheType::GameDetail => 24 * HOUR,
        CacheType::GameSearch => HOUR,
        CacheType::Trending => 6 * HOUR,
        CacheType::Series => 24 * HOUR,
        CacheType::Videos => 24 * HOUR,
        CacheType::Screenshots => 24 * HOUR,
        CacheType::ProfileStats => 15 * MINUTE,
    };
    Duration::from_secs(secs)
}

/// Environment variable overriding the TTL of `cache_type`, e.g.
/// `GAMECACHE_TTL_GAME_DETAIL_SECS`.
pub fn ttl_env_var(cache_type: CacheType) -> String {
    format!(
        "GAMECACHE_TTL_{}_SECS",
        cache_type.as_str().replace('-', "_").to_ascii_uppercase()
    )
}

/// Cache layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live per cache type. Must cover every type.
    pub ttls: BTreeMap<CacheType, Duration>,
    pub backend: CacheBackendKind,
    pub lmdb_path: PathBuf,
    pub lmdb_max_size_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttls: CacheType::ALL
                .iter()
                .map(|t| (*t, default_ttl(*t)))
                .collect(),
            backend: CacheBackendKind::Memory,
            lmdb_path: PathBuf::from("./data/gamecache-lmdb"),
            lmdb_max_size_mb: 1024,
        }
    }
}

impl CacheSettings {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `GAMECACHE_TTL_<TYPE>_SECS`: TTL override per cache type
    /// - `GAMECACHE_CACHE_BACKEND`: `memory`, `lmdb` or `postgres` (default: memory)
    /// - `GAMECACHE_LMDB_PATH`: LMDB environment directory
    /// - `GAMECACHE_LMDB_MAX_SIZE_MB`: LMDB map size (default: 1024)
    ///
    /// Unlike unset variables, malformed values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut ttls = defaults.ttls;
        for cache_type in CacheType::ALL {
            if let Some(secs) = env_parse::<u64>(&ttl_env_var(cache_type))? {
                ttls.insert(cache_type, Duration::from_secs(secs));
            }
        }

        let backend = match std::env::var("GAMECACHE_CACHE_BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.backend,
        };

        Ok(Self {
            ttls,
            backend,
            lmdb_path: std::env::var("GAMECACHE_LMDB_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.lmdb_path),
            lmdb_max_size_mb: env_parse("GAMECACHE_LMDB_MAX_SIZE_MB")?
                .unwrap_or(defaults.lmdb_max_size_mb),
        })
    }

    pub fn ttl(&self, cache_type: CacheType) -> Option<Duration> {
        self.ttls.get(&cache_type).copied()
    }

    /// Builder: override one TTL.
    pub fn with_ttl(mut self, cache_type: CacheType, ttl: Duration) -> Self {
        self.ttls.insert(cache_type, ttl);
        self
    }

    /// Validate the settings.
    ///
    /// Validates:
    /// - every cache type has a TTL
    /// - lmdb_max_size_mb > 0 when the LMDB backend is selected
    pub fn validate(&self) -> Result<(), ConfigError> {
        for cache_type in CacheType::ALL {
            if !self.ttls.contains_key(&cache_type) {
                return Err(ConfigError::MissingRequired {
                    field: ttl_env_var(cache_type),
                });
            }
        }

        if self.backend == CacheBackendKind::Lmdb && self.lmdb_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_LMDB_MAX_SIZE_MB".to_string(),
                value: "0".to_string(),
                reason: "lmdb map size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Read and parse an environment variable. Unset or blank is `Ok(None)`.
pub fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw,
                reason: format!("could not parse as {}", std::any::type_name::<T>()),
            }),
        _ => Ok(None),
    }
}
