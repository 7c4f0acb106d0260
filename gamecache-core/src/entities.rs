//! Core entity structures

use serde::{Deserialize, Serialize};

use crate::enums::{CacheType, ListStatus};
use crate::error::{StorageError, ValidationError};
use crate::identity::{ResourceId, Timestamp};
use crate::key::CacheKey;

/// A cached, normalized provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: CacheKey,
    #[serde(rename = "type")]
    pub cache_type: CacheType,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub refreshed_at: Timestamp,
}

impl CacheEntry {
    /// A first write: created and refreshed at the same instant. The type is
    /// always the one the key was built for.
    pub fn new(key: CacheKey, payload: serde_json::Value, now: Timestamp) -> Self {
        Self {
            cache_type: key.cache_type(),
            key,
            payload,
            created_at: now,
            refreshed_at: now,
        }
    }

    /// Replace the payload, keeping `created_at`.
    pub fn refreshed(self, payload: serde_json::Value, now: Timestamp) -> Self {
        Self {
            payload,
            refreshed_at: now,
            ..self
        }
    }

    /// Reject entries whose type disagrees with their key, or that would
    /// break `refreshed_at >= created_at`.
    pub fn check_invariants(&self) -> Result<(), StorageError> {
        if self.cache_type != self.key.cache_type() {
            return Err(StorageError::WriteRejected {
                key: self.key.to_string(),
                reason: format!(
                    "type {} does not match key type {}",
                    self.cache_type,
                    self.key.cache_type()
                ),
            });
        }
        if self.refreshed_at < self.created_at {
            return Err(StorageError::WriteRejected {
                key: self.key.to_string(),
                reason: format!(
                    "refreshedAt {} precedes createdAt {}",
                    self.refreshed_at, self.created_at
                ),
            });
        }
        Ok(())
    }
}

/// A viewer rating, 1 to 10 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::InvalidValue {
                field: "rating".to_string(),
                reason: format!("{} is outside 1-10", value),
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Per-viewer state for one game. Owned by the viewer-state store and never
/// written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRecord {
    pub resource_id: ResourceId,
    pub status: ListStatus,
    pub rating: Option<Rating>,
}

/// Anything that can carry viewer overlay fields.
pub trait OverlayTarget {
    fn resource_id(&self) -> ResourceId;
}

/// An item with the viewer's overlay fields merged in.
///
/// The viewer's own score is `viewerRating` so it never shadows the item's
/// provider `rating` once flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enriched<T> {
    #[serde(flatten)]
    pub item: T,
    pub in_list: bool,
    pub status: Option<ListStatus>,
    pub viewer_rating: Option<Rating>,
}

impl<T> Enriched<T> {
    /// No viewer state for this item.
    pub fn bare(item: T) -> Self {
        Self {
            item,
            in_list: false,
            status: None,
            viewer_rating: None,
        }
    }

    pub fn with_record(item: T, record: Option<&OverlayRecord>) -> Self {
        match record {
            Some(record) => Self {
                item,
                in_list: true,
                status: Some(record.status),
                viewer_rating: record.rating,
            },
            None => Self::bare(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Provider, ResourceKind};
    use crate::key::build_key;
    use crate::params::RequestParams;
    use chrono::{Duration, Utc};

    fn detail_key(id: u64) -> CacheKey {
        build_key(Provider::Rawg, ResourceKind::Detail, &RequestParams::new().with("id", id))
            .expect("valid key")
            .0
    }

    #[test]
    fn test_refreshed_keeps_created_at() {
        let t0 = Utc::now();
        let entry = CacheEntry::new(detail_key(1), serde_json::json!({"v": 1}), t0);
        let later = t0 + Duration::seconds(30);
        let refreshed = entry.refreshed(serde_json::json!({"v": 2}), later);
        assert_eq!(refreshed.created_at, t0);
        assert_eq!(refreshed.refreshed_at, later);
        assert_eq!(refreshed.payload["v"], 2);
        assert!(refreshed.check_invariants().is_ok());
    }

    #[test]
    fn test_backwards_timestamps_rejected() {
        let t0 = Utc::now();
        let mut entry = CacheEntry::new(detail_key(2), serde_json::json!(null), t0);
        entry.refreshed_at = t0 - Duration::seconds(1);
        assert!(matches!(
            entry.check_invariants(),
            Err(StorageError::WriteRejected { .. })
        ));
    }

    #[test]
    fn test_type_follows_key() {
        let mut entry = CacheEntry::new(detail_key(4), serde_json::json!({}), Utc::now());
        assert_eq!(entry.cache_type, CacheType::GameDetail);
        assert!(entry.check_invariants().is_ok());

        entry.cache_type = CacheType::Trending;
        assert!(matches!(
            entry.check_invariants(),
            Err(StorageError::WriteRejected { .. })
        ));
    }

    #[test]
    fn test_entry_serializes_camel_case_with_type() {
        let entry = CacheEntry::new(detail_key(3), serde_json::json!([]), Utc::now());
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["key"], "rawg:detail:3");
        assert_eq!(value["type"], "game-detail");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("refreshedAt").is_some());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(11).is_err());
        assert_eq!(Rating::new(10).map(|r| r.value()), Ok(10));
        assert!(serde_json::from_str::<Rating>("12").is_err());
    }

    #[test]
    fn test_enriched_with_record() {
        let record = OverlayRecord {
            resource_id: ResourceId::rawg(9),
            status: ListStatus::Completed,
            rating: Rating::new(8).ok(),
        };
        let enriched = Enriched::with_record("x", Some(&record));
        assert!(enriched.in_list);
        assert_eq!(enriched.status, Some(ListStatus::Completed));

        let bare = Enriched::with_record("y", None);
        assert!(!bare.in_list);
        assert_eq!(bare.status, None);
        assert_eq!(bare.viewer_rating, None);
    }
}
