//! Concurrent writers and fetchers against the in-memory and LMDB stores.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gamecache_core::{CacheEntry, Provider, ProviderError, RequestParams, ResourceKind};
use gamecache_storage::{
    CacheStore, FetchOptions, InMemoryCacheStore, LmdbCacheStore, ProviderAdapter,
    ProviderRegistry, ReadStatus, ReadThroughFetcher, TtlPolicy,
};
use gamecache_test_utils::{assertions, fixtures};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Barrier;

const WRITERS: u64 = 16;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid instant")
}

/// Large enough that an interleaved write would show up as a mixed payload.
fn writer_payload(writer: u64) -> Value {
    json!({
        "writer": writer,
        "name": format!("Writer {}", writer),
        "tags": vec![writer; 64],
    })
}

/// Race `WRITERS` puts on one key against puts on unrelated keys.
async fn race_puts<S: CacheStore + 'static>(store: Arc<S>) {
    let seeded = store
        .put(fixtures::entry_at(
            fixtures::detail_key(Provider::Rawg, 1),
            json!({"writer": "seed"}),
            t0(),
        ))
        .await
        .expect("seed");

    let mut tasks = Vec::new();
    for writer in 0..WRITERS {
        let writer_store = store.clone();
        let key = seeded.key.clone();
        tasks.push(tokio::spawn(async move {
            let at = t0() + chrono::Duration::seconds(writer as i64 + 1);
            writer_store.put(CacheEntry::new(key, writer_payload(writer), at)).await
        }));

        let other_store = store.clone();
        tasks.push(tokio::spawn(async move {
            other_store
                .put(fixtures::entry_at(
                    fixtures::detail_key(Provider::Igdb, 100 + writer),
                    json!({"id": 100 + writer}),
                    t0(),
                ))
                .await
        }));
    }
    for task in tasks {
        let stored = task.await.expect("task").expect("put");
        assertions::assert_timestamps_ordered(&stored);
    }

    let entry = store.get(&seeded.key).await.expect("get").expect("present");
    let writer = entry.payload["writer"].as_u64().expect("a writer's payload");
    assert!(writer < WRITERS);
    assert_eq!(entry.payload, writer_payload(writer));
    assert_eq!(entry.created_at, t0());
    assert_eq!(entry.refreshed_at, t0() + chrono::Duration::seconds(writer as i64 + 1));
    assertions::assert_timestamps_ordered(&entry);

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.entry_count, WRITERS + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_puts_leave_one_whole_entry_in_memory() {
    race_puts(Arc::new(InMemoryCacheStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_puts_leave_one_whole_entry_in_lmdb() {
    let dir = TempDir::new().expect("temp dir");
    let store = LmdbCacheStore::new(dir.path(), 10).expect("lmdb store");
    race_puts(Arc::new(store)).await;
}

/// Holds every caller at a barrier until `parties` of them are in flight at
/// once. Fetches that serialized on each other would never get past it.
struct GatedAdapter {
    barrier: Barrier,
}

#[async_trait]
impl ProviderAdapter for GatedAdapter {
    fn provider(&self) -> Provider {
        Provider::Rawg
    }

    async fn fetch_raw(&self, _kind: ResourceKind, params: &RequestParams) -> Result<Value, ProviderError> {
        self.barrier.wait().await;
        Ok(json!({ "id": params.get("id") }))
    }

    fn normalize(&self, _kind: ResourceKind, raw: Value) -> Result<Value, ProviderError> {
        Ok(raw)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fetches_on_different_keys_run_concurrently() {
    let parties = 8usize;
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(GatedAdapter {
        barrier: Barrier::new(parties),
    }));
    let store = Arc::new(InMemoryCacheStore::new());
    let fetcher = Arc::new(ReadThroughFetcher::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(TtlPolicy::uniform(Duration::from_secs(3600))),
    ));

    let mut tasks = Vec::new();
    for id in 0..parties as u64 {
        let fetcher = fetcher.clone();
        tasks.push(tokio::spawn(async move {
            fetcher
                .fetch(
                    Provider::Rawg,
                    ResourceKind::Detail,
                    &RequestParams::new().with("id", id),
                    FetchOptions::default(),
                )
                .await
        }));
    }

    let all = async {
        let mut reads = Vec::new();
        for task in tasks {
            reads.push(task.await.expect("task").expect("fetch"));
        }
        reads
    };
    let reads = tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("fetches on distinct keys blocked each other");

    assert!(reads.iter().all(|r| r.status() == ReadStatus::Fetched));
    assert_eq!(store.len(), parties);
}
