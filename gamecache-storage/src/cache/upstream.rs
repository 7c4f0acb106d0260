//! Provider adapter seam and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gamecache_core::{Provider, ProviderError, RequestParams, ResourceKind};

/// One upstream game-metadata provider.
///
/// `fetch_raw` performs the network call; `normalize` turns the provider's
/// payload into one of the catalog shapes. Both are read-only. Timeouts and
/// rate limiting are the adapter's job.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_raw(
        &self,
        kind: ResourceKind,
        params: &RequestParams,
    ) -> Result<serde_json::Value, ProviderError>;

    fn normalize(
        &self,
        kind: ResourceKind,
        raw: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Fetch and normalize.
    async fn fetch(
        &self,
        kind: ResourceKind,
        params: &RequestParams,
    ) -> Result<serde_json::Value, ProviderError> {
        let raw = self.fetch_raw(kind, params).await?;
        self.normalize(kind, raw)
    }
}

/// Adapters by provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register an adapter under its own provider.
    pub fn with_adapter<A: ProviderAdapter + 'static>(mut self, adapter: A) -> Self {
        self.register(Arc::new(adapter));
        self
    }

    /// Register an adapter, replacing any previous one for the same provider.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    /// Look up the adapter, failing with `NotConfigured` when absent.
    pub fn require(&self, provider: Provider) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        self.get(provider)
            .ok_or(ProviderError::NotConfigured { provider })
    }

    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.adapters.keys().copied().collect();
        providers.sort();
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoAdapter(Provider);

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn provider(&self) -> Provider {
            self.0
        }

        async fn fetch_raw(
            &self,
            kind: ResourceKind,
            params: &RequestParams,
        ) -> Result<serde_json::Value, ProviderError> {
            Ok(json!({ "kind": kind.as_str(), "params": params }))
        }

        fn normalize(
            &self,
            _kind: ResourceKind,
            raw: serde_json::Value,
        ) -> Result<serde_json::Value, ProviderError> {
            Ok(json!({ "normalized": raw }))
        }
    }

    #[tokio::test]
    async fn test_fetch_runs_normalize() {
        let adapter = EchoAdapter(Provider::Rawg);
        let value = adapter
            .fetch(ResourceKind::Detail, &RequestParams::new().with("id", 3))
            .await
            .expect("fetch");
        assert_eq!(value["normalized"]["kind"], "detail");
        assert_eq!(value["normalized"]["params"]["id"], "3");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProviderRegistry::new().with_adapter(EchoAdapter(Provider::Igdb));
        assert!(registry.get(Provider::Igdb).is_some());
        assert_eq!(registry.providers(), vec![Provider::Igdb]);
        assert!(matches!(
            registry.require(Provider::Rawg),
            Err(ProviderError::NotConfigured { provider: Provider::Rawg })
        ));
    }
}
