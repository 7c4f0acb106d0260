//! Error types for gamecache operations

use crate::enums::{Provider, ResourceKind};
use thiserror::Error;

/// Request defects: bad keys, missing or malformed parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required parameter missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Parameter '{name}' given more than once")]
    DuplicateParameter { name: String },

    #[error("Unknown parameter '{name}' for resource kind {kind}")]
    UnknownParameter { kind: ResourceKind, name: String },

    #[error("Invalid cache key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::TransactionFailed { .. } | StorageError::Unavailable { .. }
        )
    }
}

/// Upstream provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("No adapter configured for provider {provider}")]
    NotConfigured { provider: Provider },

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: Provider,
        retry_after_ms: u64,
    },

    #[error("Request to {provider} timed out")]
    Timeout { provider: Provider },

    #[error("Transport error talking to {provider}: {reason}")]
    Transport { provider: Provider, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: Provider, reason: String },

    #[error("Provider {provider} does not serve resource kind {kind}")]
    UnsupportedResource {
        provider: Provider,
        kind: ResourceKind,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all gamecache errors.
#[derive(Debug, Clone, Error)]
pub enum GameCacheError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Upstream fetch from {provider} failed: {source}")]
    UpstreamFetch {
        provider: Provider,
        #[source]
        source: ProviderError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl GameCacheError {
    pub fn upstream(provider: Provider, source: ProviderError) -> Self {
        GameCacheError::UpstreamFetch { provider, source }
    }

    /// True for upstream failures and transient storage failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            GameCacheError::UpstreamFetch { .. } => true,
            GameCacheError::Storage(err) => err.is_transient(),
            GameCacheError::InvalidRequest(_) | GameCacheError::Config(_) => false,
        }
    }
}

/// Result type alias for gamecache operations.
pub type GameCacheResult<T> = Result<T, GameCacheError>;

// =============================================================================
// TESTS
// =============================================================================
