//! gamecache Test Utilities
//!
//! Shared test infrastructure for the gamecache workspace:
//! - Scripted provider adapter and viewer-state store with call counters
//! - Proptest generators for keys, entries and catalog shapes
//! - Fixtures for common scenarios
//! - Assertions over the error taxonomy

pub use gamecache_core::{
    build_key, CacheEntry, CacheKey, CacheType, ConfigError, Enriched, GameCacheError,
    GameCacheResult, GameSummary, ListStatus, OverlayRecord, Provider, ProviderError, Rating,
    RequestParams, ResourceId, ResourceKind, StorageError, Timestamp, ValidationError, ViewerId,
};
pub use gamecache_storage::{ProviderAdapter, ViewerStateStore};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

// ============================================================================
// MOCK PROVIDER ADAPTER
// ============================================================================

/// Provider adapter that answers from a script.
///
/// Queued outcomes are consumed first, one per call; once the queue is empty
/// every call gets the standing outcome. `normalize` is the identity, so the
/// scripted values are what lands in the cache.
#[derive(Debug)]
pub struct MockProviderAdapter {
    provider: Provider,
    standing: Mutex<Result<Value, ProviderError>>,
    queued: Mutex<VecDeque<Result<Value, ProviderError>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(ResourceKind, RequestParams)>>,
}

impl MockProviderAdapter {
    /// An adapter that always answers `payload`.
    pub fn returning(provider: Provider, payload: Value) -> Self {
        Self::with_outcome(provider, Ok(payload))
    }

    /// An adapter that always fails with `error`.
    pub fn failing(provider: Provider, error: ProviderError) -> Self {
        Self::with_outcome(provider, Err(error))
    }

    fn with_outcome(provider: Provider, outcome: Result<Value, ProviderError>) -> Self {
        Self {
            provider,
            standing: Mutex::new(outcome),
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Replace the standing outcome with a payload.
    pub fn set_payload(&self, payload: Value) {
        *self.standing.lock().unwrap_or_else(|e| e.into_inner()) = Ok(payload);
    }

    /// Replace the standing outcome with a failure.
    pub fn set_failure(&self, error: ProviderError) {
        *self.standing.lock().unwrap_or_else(|e| e.into_inner()) = Err(error);
    }

    /// Queue a one-shot outcome ahead of the standing one.
    pub fn enqueue(&self, outcome: Result<Value, ProviderError>) {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    /// Number of upstream calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(ResourceKind, RequestParams)> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockProviderAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_raw(&self, kind: ResourceKind, params: &RequestParams) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some((kind, params.clone()));

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match queued {
            Some(outcome) => outcome,
            None => self
                .standing
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    fn normalize(&self, _kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
        Ok(raw)
    }
}

// ============================================================================
// MOCK VIEWER STATE STORE
// ============================================================================

/// Viewer-state store that counts bulk lookups.
#[derive(Debug, Default)]
pub struct MockViewerStateStore {
    records: Mutex<HashMap<(ViewerId, ResourceId), OverlayRecord>>,
    calls: AtomicUsize,
    fail_with: Mutex<Option<StorageError>>,
}

impl MockViewerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed one record.
    pub fn with_record(self, viewer: ViewerId, record: OverlayRecord) -> Self {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((viewer, record.resource_id), record);
        self
    }

    /// Make every later lookup fail.
    pub fn fail_with(&self, error: StorageError) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Number of bulk lookups so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewerStateStore for MockViewerStateStore {
    async fn get_states_for_resources(
        &self,
        viewer: ViewerId,
        ids: &[ResourceId],
    ) -> GameCacheResult<HashMap<ResourceId, OverlayRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_with.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(error.into());
        }
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(ids
            .iter()
            .filter_map(|id| records.get(&(viewer, *id)).map(|r| (*id, r.clone())))
            .collect())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for gamecache types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_provider() -> impl Strategy<Value = Provider> {
        prop::sample::select(Provider::ALL.to_vec())
    }

    pub fn arb_resource_kind() -> impl Strategy<Value = ResourceKind> {
        prop::sample::select(ResourceKind::ALL.to_vec())
    }

    pub fn arb_cache_type() -> impl Strategy<Value = CacheType> {
        prop::sample::select(CacheType::ALL.to_vec())
    }

    pub fn arb_list_status() -> impl Strategy<Value = ListStatus> {
        prop_oneof![
            Just(ListStatus::Playing),
            Just(ListStatus::Completed),
            Just(ListStatus::Backlog),
            Just(ListStatus::Wishlist),
            Just(ListStatus::Dropped),
        ]
    }

    pub fn arb_rating() -> impl Strategy<Value = Rating> {
        (1u8..=10).prop_filter_map("rating out of range", |v| Rating::new(v).ok())
    }

    pub fn arb_viewer_id() -> impl Strategy<Value = ViewerId> {
        any::<[u8; 16]>().prop_map(|bytes| ViewerId::new(Uuid::from_bytes(bytes)))
    }

    pub fn arb_resource_id() -> impl Strategy<Value = ResourceId> {
        (arb_provider(), 1u64..10_000_000).prop_map(|(provider, id)| ResourceId::new(provider, id))
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64).prop_filter_map("timestamp out of range", |secs| {
            chrono::DateTime::from_timestamp(secs, 0)
        })
    }

    /// Arbitrary JSON, a few levels deep.
    pub fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 :&=%]{0,24}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// A search query with irregular spacing and case.
    pub fn arb_search_query() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-zA-Z0-9:&=%]{1,8}", 1..5)
            .prop_flat_map(|words| {
                let n = words.len();
                (Just(words), prop::collection::vec("[ \t]{1,3}", n))
            })
            .prop_map(|(words, gaps)| {
                words
                    .iter()
                    .zip(gaps.iter())
                    .map(|(w, g)| format!("{}{}", g, w))
                    .collect::<String>()
            })
    }

    /// Valid request params for `kind`.
    pub fn arb_params_for(kind: ResourceKind) -> BoxedStrategy<RequestParams> {
        let paging = (prop::option::of(1u32..50), prop::option::of(1u32..=40));
        match kind {
            ResourceKind::Detail | ResourceKind::Videos => (1u64..10_000_000)
                .prop_map(|id| RequestParams::new().with("id", id))
                .boxed(),
            ResourceKind::Series | ResourceKind::Screenshots => (1u64..10_000_000, paging)
                .prop_map(|(id, paging)| with_paging(RequestParams::new().with("id", id), paging))
                .boxed(),
            ResourceKind::Search => (arb_search_query(), paging)
                .prop_map(|(q, paging)| with_paging(RequestParams::new().with("q", q), paging))
                .boxed(),
            ResourceKind::Trending => paging
                .prop_map(|paging| with_paging(RequestParams::new(), paging))
                .boxed(),
            ResourceKind::ProfileStats => "[a-zA-Z][a-zA-Z0-9_]{2,15}"
                .prop_map(|user| RequestParams::new().with("user", user))
                .boxed(),
        }
    }

    fn with_paging(mut params: RequestParams, (page, page_size): (Option<u32>, Option<u32>)) -> RequestParams {
        if let Some(page) = page {
            params.insert("page", &page.to_string());
        }
        if let Some(page_size) = page_size {
            params.insert("page_size", &page_size.to_string());
        }
        params
    }

    /// A kind together with valid params for it.
    pub fn arb_request() -> impl Strategy<Value = (Provider, ResourceKind, RequestParams)> {
        (arb_provider(), arb_resource_kind())
            .prop_flat_map(|(provider, kind)| (Just(provider), Just(kind), arb_params_for(kind)))
    }

    /// A valid entry with `refreshed_at >= created_at`.
    pub fn arb_cache_entry() -> impl Strategy<Value = CacheEntry> {
        (arb_request(), arb_json(), arb_timestamp(), 0i64..1_000_000).prop_filter_map(
            "request did not produce a key",
            |((provider, kind, params), payload, created_at, refresh_delay)| {
                let (key, _) = build_key(provider, kind, &params).ok()?;
                let mut entry = CacheEntry::new(key, payload, created_at);
                entry.refreshed_at = created_at + chrono::Duration::seconds(refresh_delay);
                Some(entry)
            },
        )
    }

    pub fn arb_game_summary() -> impl Strategy<Value = GameSummary> {
        (
            arb_resource_id(),
            "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,8})?",
            prop::option::of(0.0f32..5.0),
            prop::collection::vec(prop::sample::select(vec!["Action", "RPG", "Puzzle", "Shooter"]), 0..3),
        )
            .prop_map(|(rid, name, rating, genres)| GameSummary {
                provider: rid.provider,
                id: rid.id,
                name,
                slug: None,
                released: None,
                cover_url: None,
                rating,
                genres: genres.into_iter().map(str::to_string).collect(),
                platforms: vec!["PC".to_string()],
            })
    }

    pub fn arb_overlay_record() -> impl Strategy<Value = OverlayRecord> {
        (arb_resource_id(), arb_list_status(), prop::option::of(arb_rating())).prop_map(
            |(resource_id, status, rating)| OverlayRecord {
                resource_id,
                status,
                rating,
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;
    use serde_json::json;

    /// Key and type for a detail request.
    pub fn detail_key(provider: Provider, id: u64) -> (CacheKey, CacheType) {
        build_key(provider, ResourceKind::Detail, &RequestParams::new().with("id", id))
            .unwrap_or_else(|e| panic!("detail key for {} should build: {}", id, e))
    }

    /// Key and type for a trending page.
    pub fn trending_key(provider: Provider, page: u32) -> (CacheKey, CacheType) {
        build_key(provider, ResourceKind::Trending, &RequestParams::new().with("page", page))
            .unwrap_or_else(|e| panic!("trending key for page {} should build: {}", page, e))
    }

    /// A first-write entry at `at`.
    pub fn entry_at((key, _): (CacheKey, CacheType), payload: Value, at: Timestamp) -> CacheEntry {
        CacheEntry::new(key, payload, at)
    }

    pub fn game_summary(provider: Provider, id: u64) -> GameSummary {
        GameSummary {
            provider,
            id,
            name: format!("Game {}", id),
            slug: Some(format!("game-{}", id)),
            released: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
            cover_url: None,
            rating: Some(4.0),
            genres: vec!["Action".to_string()],
            platforms: vec!["PC".to_string()],
        }
    }

    /// A normalized detail payload as an adapter would return it.
    pub fn detail_payload(provider: Provider, id: u64) -> Value {
        let summary = game_summary(provider, id);
        json!({
            "provider": summary.provider,
            "id": summary.id,
            "name": summary.name,
            "slug": summary.slug,
            "released": summary.released,
            "coverUrl": null,
            "rating": summary.rating,
            "genres": summary.genres,
            "platforms": summary.platforms,
            "description": "A fixture game.",
            "website": null,
            "developers": ["Fixture Studio"],
            "publishers": [],
            "metacritic": 80
        })
    }

    /// A normalized page payload holding one summary per id.
    pub fn game_page_payload(provider: Provider, ids: &[u64]) -> Value {
        let results: Vec<GameSummary> = ids.iter().map(|id| game_summary(provider, *id)).collect();
        json!({
            "count": ids.len(),
            "page": 1,
            "nextPage": null,
            "results": results,
        })
    }

    pub fn overlay(resource_id: ResourceId, status: ListStatus, rating: Option<u8>) -> OverlayRecord {
        OverlayRecord {
            resource_id,
            status,
            rating: rating.and_then(|r| Rating::new(r).ok()),
        }
    }

    pub fn viewer() -> ViewerId {
        ViewerId::new(uuid::Uuid::now_v7())
    }

    pub fn upstream_down(provider: Provider) -> ProviderError {
        ProviderError::RequestFailed {
            provider,
            status: 503,
            message: "service unavailable".to_string(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over results and entries.

    use super::*;

    #[track_caller]
    pub fn assert_invalid_request<T: std::fmt::Debug>(result: &GameCacheResult<T>) {
        match result {
            Err(GameCacheError::InvalidRequest(_)) => {}
            other => panic!("Expected InvalidRequest, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_upstream_fetch<T: std::fmt::Debug>(result: &GameCacheResult<T>, provider: Provider) {
        match result {
            Err(GameCacheError::UpstreamFetch { provider: p, .. }) => {
                assert_eq!(*p, provider, "Wrong provider in UpstreamFetch");
            }
            other => panic!("Expected UpstreamFetch from {:?}, got: {:?}", provider, other),
        }
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &GameCacheResult<T>) {
        match result {
            Err(GameCacheError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_timestamps_ordered(entry: &CacheEntry) {
        assert!(
            entry.refreshed_at >= entry.created_at,
            "refreshedAt {} precedes createdAt {} for {}",
            entry.refreshed_at,
            entry.created_at,
            entry.key
        );
    }

    /// Every item carries no viewer state.
    #[track_caller]
    pub fn assert_all_bare<T: std::fmt::Debug>(items: &[Enriched<T>]) {
        for item in items {
            assert!(
                !item.in_list && item.status.is_none() && item.viewer_rating.is_none(),
                "Expected bare item, got: {:?}",
                item
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_adapter_queue_then_standing() {
        let adapter = MockProviderAdapter::returning(Provider::Rawg, json!({"v": "standing"}));
        adapter.enqueue(Err(fixtures::upstream_down(Provider::Rawg)));

        let params = RequestParams::new().with("id", 1);
        assert!(adapter.fetch(ResourceKind::Detail, &params).await.is_err());
        assert_eq!(
            adapter.fetch(ResourceKind::Detail, &params).await.expect("standing"),
            json!({"v": "standing"})
        );
        assert_eq!(adapter.calls(), 2);
        assert_eq!(adapter.last_request(), Some((ResourceKind::Detail, params)));
    }

    #[tokio::test]
    async fn test_mock_adapter_switches_to_failure() {
        let adapter = MockProviderAdapter::returning(Provider::Igdb, json!(1));
        adapter.set_failure(ProviderError::Timeout { provider: Provider::Igdb });
        let err = adapter
            .fetch(ResourceKind::Trending, &RequestParams::new())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Timeout { provider: Provider::Igdb });
    }

    #[tokio::test]
    async fn test_mock_viewer_store() {
        let viewer = fixtures::viewer();
        let store = MockViewerStateStore::new().with_record(
            viewer,
            fixtures::overlay(ResourceId::rawg(3), ListStatus::Backlog, Some(7)),
        );

        let states = store
            .get_states_for_resources(viewer, &[ResourceId::rawg(3), ResourceId::rawg(4)])
            .await
            .expect("lookup");
        assert_eq!(states.len(), 1);
        assert_eq!(store.calls(), 1);

        store.fail_with(StorageError::Unavailable {
            reason: "down".to_string(),
        });
        let result = store.get_states_for_resources(viewer, &[ResourceId::rawg(3)]).await;
        assertions::assert_storage_error(&result);
    }

    #[test]
    fn test_fixture_payloads_deserialize() {
        let detail: gamecache_core::GameDetail =
            serde_json::from_value(fixtures::detail_payload(Provider::Rawg, 10)).expect("detail");
        assert_eq!(detail.summary.id, 10);

        let page: gamecache_core::GamePage =
            serde_json::from_value(fixtures::game_page_payload(Provider::Igdb, &[1, 2, 3])).expect("page");
        assert_eq!(page.results.len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_requests_build_keys((provider, kind, params) in generators::arb_request()) {
            prop_assert!(build_key(provider, kind, &params).is_ok());
        }

        #[test]
        fn prop_generated_entries_are_ordered(entry in generators::arb_cache_entry()) {
            assertions::assert_timestamps_ordered(&entry);
        }
    }
}
