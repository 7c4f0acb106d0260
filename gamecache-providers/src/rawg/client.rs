//! RAWG HTTP client

use gamecache_core::{Provider, ProviderError};
use reqwest::Url;
use serde_json::Value;

use crate::config::{ProviderSettings, RawgSettings};
use crate::http::RateLimitedClient;

/// RAWG API client with rate limiting.
pub struct RawgClient {
    http: RateLimitedClient,
    api_key: String,
    base_url: Url,
}

impl RawgClient {
    pub fn new(rawg: &RawgSettings, settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: RateLimitedClient::new(Provider::Rawg, settings.timeout, settings.requests_per_minute)?,
            api_key: rawg.api_key.clone(),
            base_url: base_url(&rawg.base_url)?,
        })
    }

    /// GET `{base_url}/{segments...}` with the API key appended to `query`.
    ///
    /// Each segment is percent-encoded on its own, so caller-supplied values
    /// cannot add path components, a query or a fragment.
    pub async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value, ProviderError> {
        let url = self.url(segments)?;
        let request = self
            .http
            .http()
            .get(url)
            .query(query)
            .query(&[("key", self.api_key.as_str())]);
        self.http.send_json(request).await
    }
}

impl RawgClient {
    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| invalid_base(self.base_url.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn base_url(raw: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|_| invalid_base(raw))?;
    if url.cannot_be_a_base() {
        return Err(invalid_base(raw));
    }
    Ok(url)
}

fn invalid_base(raw: &str) -> ProviderError {
    ProviderError::Transport {
        provider: Provider::Rawg,
        reason: format!("invalid base URL '{}'", raw),
    }
}

impl std::fmt::Debug for RawgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawgClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RawgClient {
        let settings = ProviderSettings::default().with_rawg("k", base);
        let rawg = settings.rawg.as_ref().expect("rawg settings");
        RawgClient::new(rawg, &settings).expect("client")
    }

    #[test]
    fn test_segments_are_encoded_individually() {
        let rawg = client("https://api.rawg.io/api/");
        let url = rawg.url(&["users", "../games/1042#", "games"]).expect("url");
        assert_eq!(url.path(), "/api/users/..%2Fgames%2F1042%23/games");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = rawg.url(&["games", "lists", "main"]).expect("url");
        assert_eq!(url.as_str(), "https://api.rawg.io/api/games/lists/main");
    }

    #[test]
    fn test_unusable_base_url_rejected() {
        let settings = ProviderSettings::default().with_rawg("k", "mailto:rawg");
        let rawg = settings.rawg.as_ref().expect("rawg settings");
        assert!(matches!(
            RawgClient::new(rawg, &settings),
            Err(ProviderError::Transport { .. })
        ));
    }
}
