//! Per-viewer overlay composition.
//!
//! Viewer state (list status, rating) is merged onto cached results at read
//! time and never written to the cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use gamecache_core::{
    Enriched, GameCacheResult, OverlayRecord, OverlayTarget, ResourceId, StorageError, ViewerId,
};

/// Source of per-viewer state.
#[async_trait]
pub trait ViewerStateStore: Send + Sync {
    /// Records for every id in `ids` the viewer has in their list. Ids with no
    /// record are simply absent from the map.
    async fn get_states_for_resources(
        &self,
        viewer: ViewerId,
        ids: &[ResourceId],
    ) -> GameCacheResult<HashMap<ResourceId, OverlayRecord>>;
}

/// Viewer state held in process.
#[derive(Debug, Default)]
pub struct InMemoryViewerStateStore {
    records: RwLock<HashMap<ViewerId, HashMap<ResourceId, OverlayRecord>>>,
}

impl InMemoryViewerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, viewer: ViewerId, record: OverlayRecord) -> GameCacheResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records
            .entry(viewer)
            .or_default()
            .insert(record.resource_id, record);
        Ok(())
    }

    pub fn remove(&self, viewer: ViewerId, id: ResourceId) -> GameCacheResult<bool> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records
            .get_mut(&viewer)
            .map(|by_id| by_id.remove(&id).is_some())
            .unwrap_or(false))
    }
}

#[async_trait]
impl ViewerStateStore for InMemoryViewerStateStore {
    async fn get_states_for_resources(
        &self,
        viewer: ViewerId,
        ids: &[ResourceId],
    ) -> GameCacheResult<HashMap<ResourceId, OverlayRecord>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(by_id) = records.get(&viewer) else {
            return Ok(HashMap::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|r| (*id, r.clone())))
            .collect())
    }
}

/// Merges viewer state onto results.
pub struct OverlayCompositor<V: ViewerStateStore> {
    viewer_states: Arc<V>,
}

impl<V: ViewerStateStore> OverlayCompositor<V> {
    pub fn new(viewer_states: Arc<V>) -> Self {
        Self { viewer_states }
    }

    pub fn viewer_states(&self) -> &Arc<V> {
        &self.viewer_states
    }

    /// Enrich `results` for `viewer`, preserving order.
    ///
    /// Without a viewer every item is bare and no lookup happens. With one,
    /// exactly one bulk lookup is made over the distinct ids, and none at all
    /// for an empty list.
    pub async fn composite<T: OverlayTarget>(
        &self,
        results: Vec<T>,
        viewer: Option<ViewerId>,
    ) -> GameCacheResult<Vec<Enriched<T>>> {
        let viewer = match viewer {
            Some(viewer) if !results.is_empty() => viewer,
            _ => return Ok(results.into_iter().map(Enriched::bare).collect()),
        };

        let mut seen = HashSet::with_capacity(results.len());
        let ids: Vec<ResourceId> = results
            .iter()
            .map(|item| item.resource_id())
            .filter(|id| seen.insert(*id))
            .collect();

        let states = self
            .viewer_states
            .get_states_for_resources(viewer, &ids)
            .await?;

        Ok(results
            .into_iter()
            .map(|item| {
                let record = states.get(&item.resource_id());
                Enriched::with_record(item, record)
            })
            .collect())
    }

    /// Enrich a single item.
    pub async fn composite_one<T: OverlayTarget>(
        &self,
        item: T,
        viewer: Option<ViewerId>,
    ) -> GameCacheResult<Enriched<T>> {
        let mut enriched = self.composite(vec![item], viewer).await?;
        enriched.pop().ok_or_else(|| {
            StorageError::Serialization {
                reason: "overlay lost its only item".to_string(),
            }
            .into()
        })
    }
}

impl<V: ViewerStateStore> Clone for OverlayCompositor<V> {
    fn clone(&self) -> Self {
        Self {
            viewer_states: Arc::clone(&self.viewer_states),
        }
    }
}
