//! gamecache Core - Data Types
//!
//! Identity types, enums, cache keys and entries, normalized catalog shapes,
//! errors and configuration shared by every other crate. No I/O lives here.

pub mod catalog;
pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod key;
pub mod params;

pub use catalog::{
    EnrichedGamePage, GameDetail, GamePage, GameSummary, ProfileStats, Screenshot,
    ScreenshotList, Video, VideoList,
};
pub use config::{default_ttl, env_parse, ttl_env_var, CacheBackendKind, CacheSettings};
pub use entities::{CacheEntry, Enriched, OverlayRecord, OverlayTarget, Rating};
pub use enums::{CacheType, EnumParseError, ListStatus, Provider, ResourceKind};
pub use error::{
    ConfigError, GameCacheError, GameCacheResult, ProviderError, StorageError, ValidationError,
};
pub use identity::{ResourceId, ResourceIdParseError, Timestamp, ViewerId};
pub use key::{build_key, CacheKey, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use params::RequestParams;
