//! Enum types for providers, resource kinds, cache types and list status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strip separators and case so `game-detail`, `game_detail` and `GameDetail`
/// parse the same.
fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Error when parsing an enum from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

// ============================================================================
// PROVIDER
// ============================================================================

/// Upstream game-metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Rawg,
    Igdb,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Rawg, Provider::Igdb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Rawg => "rawg",
            Provider::Igdb => "igdb",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "rawg" => Ok(Provider::Rawg),
            "igdb" => Ok(Provider::Igdb),
            _ => Err(EnumParseError::new("provider", s)),
        }
    }
}

// ============================================================================
// CACHE TYPE
// ============================================================================

/// Classification of a cache entry, used for TTL selection and bulk
/// invalidation. Every entry carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheType {
    GameDetail,
    GameSearch,
    Trending,
    Series,
    Videos,
    Screenshots,
    ProfileStats,
}

impl CacheType {
    pub const ALL: [CacheType; 7] = [
        CacheType::GameDetail,
        CacheType::GameSearch,
        CacheType::Trending,
        CacheType::Series,
        CacheType::Videos,
        CacheType::Screenshots,
        CacheType::ProfileStats,
    ];

    /// Tag used in keys, storage rows and the invalidation surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::GameDetail => "game-detail",
            CacheType::GameSearch => "game-search",
            CacheType::Trending => "trending",
            CacheType::Series => "series",
            CacheType::Videos => "videos",
            CacheType::Screenshots => "screenshots",
            CacheType::ProfileStats => "profile-stats",
        }
    }

    /// Stable single-byte discriminant for binary key encodings.
    pub fn as_byte(&self) -> u8 {
        match self {
            CacheType::GameDetail => 1,
            CacheType::GameSearch => 2,
            CacheType::Trending => 3,
            CacheType::Series => 4,
            CacheType::Videos => 5,
            CacheType::Screenshots => 6,
            CacheType::ProfileStats => 7,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(CacheType::GameDetail),
            2 => Some(CacheType::GameSearch),
            3 => Some(CacheType::Trending),
            4 => Some(CacheType::Series),
            5 => Some(CacheType::Videos),
            6 => Some(CacheType::Screenshots),
            7 => Some(CacheType::ProfileStats),
            _ => None,
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "gamedetail" => Ok(CacheType::GameDetail),
            "gamesearch" => Ok(CacheType::GameSearch),
            "trending" => Ok(CacheType::Trending),
            "series" => Ok(CacheType::Series),
            "videos" => Ok(CacheType::Videos),
            "screenshots" => Ok(CacheType::Screenshots),
            "profilestats" => Ok(CacheType::ProfileStats),
            _ => Err(EnumParseError::new("cache type", s)),
        }
    }
}

// ============================================================================
// RESOURCE KIND
// ============================================================================

/// Kind of logical resource requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Detail,
    Search,
    Trending,
    Series,
    Videos,
    Screenshots,
    ProfileStats,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Detail,
        ResourceKind::Search,
        ResourceKind::Trending,
        ResourceKind::Series,
        ResourceKind::Videos,
        ResourceKind::Screenshots,
        ResourceKind::ProfileStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Detail => "detail",
            ResourceKind::Search => "search",
            ResourceKind::Trending => "trending",
            ResourceKind::Series => "series",
            ResourceKind::Videos => "videos",
            ResourceKind::Screenshots => "screenshots",
            ResourceKind::ProfileStats => "profile-stats",
        }
    }

    /// The cache type entries of this kind are stored under.
    pub fn cache_type(&self) -> CacheType {
        match self {
            ResourceKind::Detail => CacheType::GameDetail,
            ResourceKind::Search => CacheType::GameSearch,
            ResourceKind::Trending => CacheType::Trending,
            ResourceKind::Series => CacheType::Series,
            ResourceKind::Videos => CacheType::Videos,
            ResourceKind::Screenshots => CacheType::Screenshots,
            ResourceKind::ProfileStats => CacheType::ProfileStats,
        }
    }

    /// Whether the normalized payload is a paged game list.
    pub fn is_game_list(&self) -> bool {
        matches!(
            self,
            ResourceKind::Search | ResourceKind::Trending | ResourceKind::Series
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "detail" => Ok(ResourceKind::Detail),
            "search" => Ok(ResourceKind::Search),
            "trending" => Ok(ResourceKind::Trending),
            "series" => Ok(ResourceKind::Series),
            "videos" => Ok(ResourceKind::Videos),
            "screenshots" => Ok(ResourceKind::Screenshots),
            "profilestats" => Ok(ResourceKind::ProfileStats),
            _ => Err(EnumParseError::new("resource kind", s)),
        }
    }
}

// ============================================================================
// LIST STATUS
// ============================================================================

/// A viewer's status for a game in their list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    Playing,
    Completed,
    Backlog,
    Wishlist,
    Dropped,
}

impl ListStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ListStatus::Playing => "playing",
            ListStatus::Completed => "completed",
            ListStatus::Backlog => "backlog",
            ListStatus::Wishlist => "wishlist",
            ListStatus::Dropped => "dropped",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize_token(s).as_str() {
            "playing" => Ok(ListStatus::Playing),
            "completed" => Ok(ListStatus::Completed),
            "backlog" => Ok(ListStatus::Backlog),
            "wishlist" => Ok(ListStatus::Wishlist),
            "dropped" => Ok(ListStatus::Dropped),
            _ => Err(EnumParseError::new("list status", s)),
        }
    }
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for ListStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}
