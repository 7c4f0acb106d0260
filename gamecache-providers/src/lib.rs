//! gamecache providers - RAWG and IGDB adapters.
//!
//! Each adapter implements [`ProviderAdapter`]: it selects the endpoint for a
//! resource kind, calls it through a rate-limited client, and normalizes the
//! response into the catalog shapes from `gamecache_core::catalog`.

pub mod config;
pub mod http;
pub mod igdb;
pub mod rawg;
pub mod request;

pub use config::{IgdbSettings, ProviderSettings, RawgSettings};
pub use http::{parse_retry_after_ms, RateLimitedClient};
pub use igdb::{IgdbAdapter, IgdbClient};
pub use rawg::{RawgAdapter, RawgClient};

use gamecache_core::ProviderError;
use gamecache_storage::{ProviderAdapter, ProviderRegistry};
use tracing::info;

/// Build a registry holding an adapter for every configured provider.
pub fn build_registry(settings: &ProviderSettings) -> Result<ProviderRegistry, ProviderError> {
    let mut registry = ProviderRegistry::new();

    if let Some(rawg) = &settings.rawg {
        let adapter = RawgAdapter::new(RawgClient::new(rawg, settings)?);
        info!(provider = adapter.provider().as_str(), base_url = %rawg.base_url, "provider registered");
        registry.register(std::sync::Arc::new(adapter));
    }

    if let Some(igdb) = &settings.igdb {
        let adapter = IgdbAdapter::new(IgdbClient::new(igdb, settings)?);
        info!(provider = adapter.provider().as_str(), base_url = %igdb.base_url, "provider registered");
        registry.register(std::sync::Arc::new(adapter));
    }

    Ok(registry)
}
