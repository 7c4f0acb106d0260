//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, plus the schema
//! backing the `game_cache` store and the viewer-state table.

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use gamecache_core::{env_parse, ConfigError};
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// SCHEMA
// ============================================================================

/// Tables used by the PostgreSQL stores. Idempotent.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS game_cache (
    key          TEXT PRIMARY KEY,
    cache_type   TEXT NOT NULL,
    payload      JSONB NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL,
    refreshed_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT game_cache_refreshed_after_created CHECK (refreshed_at >= created_at)
);

CREATE INDEX IF NOT EXISTS game_cache_cache_type_idx ON game_cache (cache_type);

CREATE TABLE IF NOT EXISTS viewer_game_state (
    viewer_id  UUID NOT NULL,
    provider   TEXT NOT NULL,
    game_id    BIGINT NOT NULL,
    status     TEXT NOT NULL,
    rating     SMALLINT CHECK (rating BETWEEN 1 AND 10),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (viewer_id, provider, game_id)
);
"#;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "gamecache".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GAMECACHE_DB_HOST` (default: localhost)
    /// - `GAMECACHE_DB_PORT` (default: 5432)
    /// - `GAMECACHE_DB_NAME` (default: gamecache)
    /// - `GAMECACHE_DB_USER` (default: postgres)
    /// - `GAMECACHE_DB_PASSWORD` (default: empty)
    /// - `GAMECACHE_DB_POOL_SIZE` (default: 16)
    /// - `GAMECACHE_DB_TIMEOUT` in seconds (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("GAMECACHE_DB_HOST").unwrap_or(defaults.host),
            port: env_parse("GAMECACHE_DB_PORT")?.unwrap_or(defaults.port),
            dbname: std::env::var("GAMECACHE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("GAMECACHE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("GAMECACHE_DB_PASSWORD").unwrap_or_default(),
            max_size: env_parse("GAMECACHE_DB_POOL_SIZE")?.unwrap_or(defaults.max_size),
            timeout: env_parse::<u64>("GAMECACHE_DB_TIMEOUT")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_DB_POOL_SIZE".to_string(),
                value: "0".to_string(),
                reason: "pool size must be greater than 0".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_DB_TIMEOUT".to_string(),
                value: "0".to_string(),
                reason: "timeout must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Create a connection pool from this configuration.
    ///
    /// Connections are opened lazily; an unreachable server surfaces on the
    /// first query, not here.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

/// Create the cache and viewer-state tables if they do not exist.
pub async fn ensure_schema(pool: &Pool) -> ApiResult<()> {
    let conn = pool.get().await?;
    conn.batch_execute(SCHEMA_SQL).await?;
    tracing::info!("Database schema ensured");
    Ok(())
}
