//! IGDB HTTP client

use gamecache_core::{Provider, ProviderError};
use serde_json::Value;

use crate::config::{IgdbSettings, ProviderSettings};
use crate::http::RateLimitedClient;

/// IGDB API client with rate limiting.
pub struct IgdbClient {
    http: RateLimitedClient,
    client_id: String,
    access_token: String,
    base_url: String,
}

impl IgdbClient {
    pub fn new(igdb: &IgdbSettings, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: RateLimitedClient::new(Provider::Igdb, settings.timeout, settings.requests_per_minute)?,
            client_id: igdb.client_id.clone(),
            access_token: igdb.access_token.clone(),
            base_url: igdb.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST an Apicalypse `body` to `{base_url}/{endpoint}`.
    pub async fn query(&self, endpoint: &str, body: String) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let request = self
            .http
            .http()
            .post(&url)
            .header("Client-ID", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "text/plain")
            .body(body);
        self.http.send_json(request).await
    }
}

impl std::fmt::Debug for IgdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgdbClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
