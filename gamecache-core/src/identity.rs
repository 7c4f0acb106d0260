//! Identity types for cached resources and viewers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::Provider;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of the viewer whose per-item state is overlaid on results.
///
/// Resolved by the identity/session layer; the cache only ever reads with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(Uuid);

impl ViewerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ViewerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ViewerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A game as identified by one upstream provider.
///
/// Provider ids are numeric for both RAWG and IGDB, but the two id spaces
/// overlap, so the provider is part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub provider: Provider,
    pub id: u64,
}

impl ResourceId {
    pub fn new(provider: Provider, id: u64) -> Self {
        Self { provider, id }
    }

    pub fn rawg(id: u64) -> Self {
        Self::new(Provider::Rawg, id)
    }

    pub fn igdb(id: u64) -> Self {
        Self::new(Provider::Igdb, id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// Error when parsing a `provider:id` resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdParseError(pub String);

impl fmt::Display for ResourceIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid resource id: {}", self.0)
    }
}

impl std::error::Error for ResourceIdParseError {}

impl FromStr for ResourceId {
    type Err = ResourceIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, id) = s
            .split_once(':')
            .ok_or_else(|| ResourceIdParseError(s.to_string()))?;
        let provider = provider
            .parse::<Provider>()
            .map_err(|_| ResourceIdParseError(s.to_string()))?;
        let id = id
            .parse::<u64>()
            .map_err(|_| ResourceIdParseError(s.to_string()))?;
        Ok(Self { provider, id })
    }
}
