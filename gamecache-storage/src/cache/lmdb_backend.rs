//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped store
//! that survives restarts.
//!
//! # Layout
//!
//! Keys are [`StoreKey`]s: the cache type byte first, so every entry of one
//! type shares a one-byte prefix and delete-by-type is a prefix scan.
//!
//! Values are `[created_at: 8][refreshed_at: 8][json]`, timestamps as
//! little-endian nanoseconds since the epoch, followed by the JSON of the
//! logical key and payload.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. `get` and `stats` use read transactions;
//! every mutation, including the `created_at` read-modify-write in `put`, runs
//! in a single write transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use gamecache_core::{
    CacheEntry, CacheKey, CacheType, GameCacheError, GameCacheResult, StorageError, Timestamp,
};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};

use super::keys::StoreKey;
use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 16;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for StorageError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::EnvOpen(_) | LmdbCacheError::DbOpen(_) | LmdbCacheError::Io(_) => {
                StorageError::Unavailable {
                    reason: e.to_string(),
                }
            }
            LmdbCacheError::Transaction(_) => StorageError::TransactionFailed {
                reason: e.to_string(),
            },
            LmdbCacheError::Serialization(_) | LmdbCacheError::Deserialization(_) => {
                StorageError::Serialization {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl From<LmdbCacheError> for GameCacheError {
    fn from(e: LmdbCacheError) -> Self {
        GameCacheError::Storage(e.into())
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// JSON body of a stored value.
#[derive(Serialize, Deserialize)]
struct StoredBody {
    key: String,
    payload: serde_json::Value,
}

fn encode_value(entry: &CacheEntry) -> Result<Vec<u8>, LmdbCacheError> {
    let created = to_nanos(entry.created_at)?;
    let refreshed = to_nanos(entry.refreshed_at)?;
    let body = serde_json::to_vec(&StoredBody {
        key: entry.key.to_string(),
        payload: entry.payload.clone(),
    })
    .map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&created.to_le_bytes());
    bytes.extend_from_slice(&refreshed.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

fn decode_created_at(bytes: &[u8]) -> Result<Timestamp, LmdbCacheError> {
    read_nanos(bytes, 0)
}

fn decode_value(cache_type: CacheType, bytes: &[u8]) -> Result<CacheEntry, LmdbCacheError> {
    if bytes.len() < HEADER_LEN {
        return Err(LmdbCacheError::Deserialization("value shorter than header".into()));
    }
    let created_at = read_nanos(bytes, 0)?;
    let refreshed_at = read_nanos(bytes, 8)?;
    let body: StoredBody = serde_json::from_slice(&bytes[HEADER_LEN..])
        .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
    let key = CacheKey::parse(&body.key).map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
    Ok(CacheEntry {
        key,
        cache_type,
        payload: body.payload,
        created_at,
        refreshed_at,
    })
}

fn to_nanos(ts: Timestamp) -> Result<i64, LmdbCacheError> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| LmdbCacheError::Serialization(format!("timestamp {} out of range", ts)))
}

fn read_nanos(bytes: &[u8], offset: usize) -> Result<Timestamp, LmdbCacheError> {
    let raw: [u8; 8] = bytes
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbCacheError::Deserialization("invalid timestamp".into()))?;
    Ok(DateTime::from_timestamp_nanos(i64::from_le_bytes(raw)))
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// let store = LmdbCacheStore::new("/var/lib/gamecache", 1024)?;
/// let stored = store.put(entry).await?;
/// let cached = store.get(&stored.key).await?;
/// ```
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbCacheStore {
    /// Open or create a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn count_with_prefix(&self, prefix: &[u8]) -> Result<u64, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut count = 0u64;
        for item in self.db.prefix_iter(&rtxn, prefix).map_err(txn_err)? {
            item.map_err(txn_err)?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> GameCacheResult<Option<CacheEntry>> {
        let store_key = StoreKey::for_key(key);
        let rtxn = self.env.read_txn().map_err(txn_err)?;

        match self.db.get(&rtxn, store_key.as_bytes()).map_err(txn_err)? {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(decode_value(key.cache_type(), bytes)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, mut entry: CacheEntry) -> GameCacheResult<CacheEntry> {
        entry.check_invariants()?;
        let store_key = StoreKey::for_key(&entry.key);

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let existing_created = match self.db.get(&wtxn, store_key.as_bytes()).map_err(txn_err)? {
            Some(bytes) => Some(decode_created_at(bytes)?),
            None => None,
        };
        if let Some(created_at) = existing_created {
            entry.created_at = created_at;
            entry.check_invariants()?;
        }

        let value = encode_value(&entry)?;
        self.db
            .put(&mut wtxn, store_key.as_bytes(), &value)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(entry)
    }

    async fn delete_by_key(&self, key: &CacheKey) -> GameCacheResult<u64> {
        let store_key = StoreKey::for_key(key);
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self
            .db
            .delete(&mut wtxn, store_key.as_bytes())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(u64::from(deleted))
    }

    async fn delete_by_type(&self, cache_type: CacheType) -> GameCacheResult<u64> {
        let prefix = StoreKey::type_prefix(cache_type);
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let mut keys = Vec::new();
        for item in self.db.prefix_iter(&wtxn, &prefix).map_err(txn_err)? {
            let (key, _) = item.map_err(txn_err)?;
            keys.push(key.to_vec());
        }

        let mut deleted = 0u64;
        for key in &keys {
            if self.db.delete(&mut wtxn, key).map_err(txn_err)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    async fn delete_all(&self) -> GameCacheResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let count = self.db.len(&wtxn).map_err(txn_err)?;
        self.db.clear(&mut wtxn).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(count)
    }

    async fn stats(&self) -> GameCacheResult<CacheStats> {
        let mut entries_by_type = BTreeMap::new();
        let mut entry_count = 0;
        for cache_type in CacheType::ALL {
            let count = self.count_with_prefix(&StoreKey::type_prefix(cache_type))?;
            if count > 0 {
                entries_by_type.insert(cache_type, count);
                entry_count += count;
            }
        }
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            entries_by_type,
        })
    }

    async fn ping(&self) -> GameCacheResult<()> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        drop(rtxn);
        Ok(())
    }
}
