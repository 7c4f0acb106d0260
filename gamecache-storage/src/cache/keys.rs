//! Cache key scheme and its binary store encoding.
//!
//! Logical keys come from [`build_key`] in `gamecache-core`. Stores that need
//! ordered binary keys (LMDB) encode them with [`StoreKey`], which puts the
//! cache type first so delete-by-type is a prefix scan.

use gamecache_core::CacheType;
use sha2::{Digest, Sha256};

pub use gamecache_core::{build_key, CacheKey, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Marks a key stored verbatim after the type byte.
const INLINE_MARKER: u8 = 0xFF;

/// Marks a key stored as a SHA-256 digest after the type byte.
const HASHED_MARKER: u8 = 0xFE;

/// Longest logical key stored verbatim. LMDB rejects keys over 511 bytes.
pub const MAX_INLINE_KEY_LEN: usize = 480;

/// Binary key for ordered stores.
///
/// # Binary Format
///
/// - Byte 0: cache type discriminant
/// - Byte 1: `0xFF` (inline) or `0xFE` (hashed)
/// - Rest: key UTF-8 bytes, or the 32-byte SHA-256 of them when the key is
///   longer than [`MAX_INLINE_KEY_LEN`]
///
/// UTF-8 never contains `0xFE` or `0xFF`, so the marker cannot be confused
/// with key text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    bytes: Vec<u8>,
}

impl StoreKey {
    pub fn for_key(key: &CacheKey) -> Self {
        let raw = key.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(2 + raw.len().min(MAX_INLINE_KEY_LEN));
        bytes.push(key.cache_type().as_byte());
        if raw.len() <= MAX_INLINE_KEY_LEN {
            bytes.push(INLINE_MARKER);
            bytes.extend_from_slice(raw);
        } else {
            bytes.push(HASHED_MARKER);
            bytes.extend_from_slice(&Sha256::digest(raw));
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_hashed(&self) -> bool {
        self.bytes.get(1) == Some(&HASHED_MARKER)
    }

    /// Prefix shared by every stored key of `cache_type`.
    pub fn type_prefix(cache_type: CacheType) -> [u8; 1] {
        [cache_type.as_byte()]
    }

    /// Cache type of an encoded key, `None` when the bytes are not a store key.
    pub fn cache_type_of(bytes: &[u8]) -> Option<CacheType> {
        match bytes {
            [type_byte, INLINE_MARKER | HASHED_MARKER, ..] => CacheType::from_byte(*type_byte),
            _ => None,
        }
    }
}

impl AsRef<[u8]> for StoreKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
