//! Provider credentials and client limits.

use std::time::Duration;

use gamecache_core::{env_parse, ConfigError};

pub const DEFAULT_RAWG_BASE_URL: &str = "https://api.rawg.io/api";
pub const DEFAULT_IGDB_BASE_URL: &str = "https://api.igdb.com/v4";

/// RAWG credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RawgSettings {
    pub api_key: String,
    pub base_url: String,
}

/// IGDB (Twitch) credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct IgdbSettings {
    pub client_id: String,
    pub access_token: String,
    pub base_url: String,
}

/// Settings for every provider adapter.
///
/// A provider without credentials is simply not registered; requests for it
/// fail with `NotConfigured`.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub rawg: Option<RawgSettings>,
    pub igdb: Option<IgdbSettings>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Outbound request budget per provider.
    pub requests_per_minute: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            rawg: None,
            igdb: None,
            timeout: Duration::from_secs(10),
            requests_per_minute: 60,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProviderSettings {
    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `RAWG_API_KEY`, `RAWG_BASE_URL`
    /// - `IGDB_CLIENT_ID`, `IGDB_ACCESS_TOKEN`, `IGDB_BASE_URL`
    /// - `GAMECACHE_PROVIDER_TIMEOUT_SECS` (default: 10)
    /// - `GAMECACHE_PROVIDER_RPM` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let rawg = env_string("RAWG_API_KEY").map(|api_key| RawgSettings {
            api_key,
            base_url: env_string("RAWG_BASE_URL").unwrap_or_else(|| DEFAULT_RAWG_BASE_URL.to_string()),
        });

        let igdb = match (env_string("IGDB_CLIENT_ID"), env_string("IGDB_ACCESS_TOKEN")) {
            (Some(client_id), Some(access_token)) => Some(IgdbSettings {
                client_id,
                access_token,
                base_url: env_string("IGDB_BASE_URL").unwrap_or_else(|| DEFAULT_IGDB_BASE_URL.to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    field: "IGDB_ACCESS_TOKEN".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingRequired {
                    field: "IGDB_CLIENT_ID".to_string(),
                })
            }
        };

        Ok(Self {
            rawg,
            igdb,
            timeout: env_parse::<u64>("GAMECACHE_PROVIDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            requests_per_minute: env_parse("GAMECACHE_PROVIDER_RPM")?
                .unwrap_or(defaults.requests_per_minute),
        })
    }

    /// Builder: configure RAWG.
    pub fn with_rawg(mut self, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.rawg = Some(RawgSettings {
            api_key: api_key.into(),
            base_url: base_url.into(),
        });
        self
    }

    /// Builder: configure IGDB.
    pub fn with_igdb(
        mut self,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        self.igdb = Some(IgdbSettings {
            client_id: client_id.into(),
            access_token: access_token.into(),
            base_url: base_url.into(),
        });
        self
    }

    /// Validate the settings.
    ///
    /// Validates:
    /// - timeout > 0
    /// - requests_per_minute > 0
    /// - base URLs are http(s)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_PROVIDER_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "timeout must be greater than 0".to_string(),
            });
        }

        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GAMECACHE_PROVIDER_RPM".to_string(),
                value: "0".to_string(),
                reason: "request budget must be greater than 0".to_string(),
            });
        }

        if let Some(rawg) = &self.rawg {
            validate_base_url("RAWG_BASE_URL", &rawg.base_url)?;
        }
        if let Some(igdb) = &self.igdb {
            validate_base_url("IGDB_BASE_URL", &igdb.base_url)?;
        }

        Ok(())
    }
}

fn validate_base_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: url.to_string(),
            reason: "must be an http(s) URL".to_string(),
        })
    }
}

impl std::fmt::Debug for RawgSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawgSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for IgdbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgdbSettings")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("rawg", &self.rawg)
            .field("igdb", &self.igdb)
            .field("timeout", &self.timeout)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}
