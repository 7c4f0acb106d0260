//! gamecache API - REST layer over the read-through cache
//!
//! This crate exposes the cache over HTTP (Axum): provider resources are
//! served from the configured store and refreshed from RAWG or IGDB when
//! stale, viewer list state is composited onto game payloads, and the
//! cache can be inspected and invalidated.
//!
//! The PostgreSQL store and viewer-state table live here as well, behind a
//! deadpool connection pool.

pub mod config;
pub mod db;
pub mod error;
pub mod pg_store;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, ServiceConfig};
pub use db::{ensure_schema, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use pg_store::{PgCacheStore, PgViewerStateStore};
pub use routes::create_router;
pub use state::{AnyCacheStore, AnyViewerStateStore, AppState};
pub use telemetry::{init_tracing, LogFormat};
