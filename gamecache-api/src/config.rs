//! API Configuration Module
//!
//! CORS and listener settings for the HTTP surface. Configuration is loaded
//! from environment variables with sensible defaults for development.

use std::net::SocketAddr;

use gamecache_core::{env_parse, CacheBackendKind, CacheSettings, ConfigError};
use gamecache_providers::ProviderSettings;

use crate::db::DbConfig;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and the listening socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://games.example.com,*.example.com"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Listener Configuration
    // ========================================================================
    /// Interface to bind.
    pub bind_host: String,

    /// Port to bind.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GAMECACHE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `GAMECACHE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `GAMECACHE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `GAMECACHE_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `GAMECACHE_API_PORT`: Port to bind (default: 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cors_origins = std::env::var("GAMECACHE_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("GAMECACHE_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.cors_allow_credentials);

        let port = match env_parse::<u16>("PORT")? {
            Some(port) => port,
            None => env_parse("GAMECACHE_API_PORT")?.unwrap_or(defaults.port),
        };

        Ok(Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: env_parse("GAMECACHE_CORS_MAX_AGE_SECS")?
                .unwrap_or(defaults.cors_max_age_secs),
            bind_host: std::env::var("GAMECACHE_API_BIND")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.bind_host),
            port,
        })
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - the bind address parses
    /// - credentials are only allowed with an explicit origin list
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.cors_allow_credentials && self.cors_origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_CORS_ALLOW_CREDENTIALS".to_string(),
                value: "true".to_string(),
                reason: "credentials require GAMECACHE_CORS_ORIGINS to list origins".to_string(),
            });
        }

        Ok(())
    }

    /// Socket address the server listens on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "GAMECACHE_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(domain) = allowed.strip_prefix("*.") {
                if let Some(host) = origin.strip_prefix("https://") {
                    return host == domain || host.ends_with(&format!(".{}", domain));
                }
            }
            false
        })
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Everything the binary reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub cache: CacheSettings,
    pub providers: ProviderSettings,
    pub api: ApiConfig,
    /// Present when the cache backend is postgres or `GAMECACHE_DB_HOST` is
    /// set; viewer state is then read from the database too.
    pub db: Option<DbConfig>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let cache = CacheSettings::from_env()?;
        let wants_db = cache.backend == CacheBackendKind::Postgres
            || std::env::var("GAMECACHE_DB_HOST").is_ok_and(|h| !h.trim().is_empty());
        Ok(Self {
            providers: ProviderSettings::from_env()?,
            api: ApiConfig::from_env()?,
            db: if wants_db { Some(DbConfig::from_env()?) } else { None },
            cache,
        })
    }

    /// Validate every section. Invalid configuration aborts startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.providers.validate()?;
        self.api.validate()?;
        if let Some(db) = &self.db {
            db.validate()?;
        }
        Ok(())
    }
}
