//! Request parameter extraction shared by the adapters.

use gamecache_core::{Provider, ProviderError, RequestParams, DEFAULT_PAGE_SIZE};

/// Requested page, with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Zero-based offset of the first result.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

fn bad_param(provider: Provider, message: String) -> ProviderError {
    ProviderError::RequestFailed {
        provider,
        status: 400,
        message,
    }
}

pub fn required_u64(provider: Provider, params: &RequestParams, name: &str) -> Result<u64, ProviderError> {
    match params.get_u64(name) {
        Some(Ok(value)) => Ok(value),
        Some(Err(_)) => Err(bad_param(provider, format!("parameter '{}' must be numeric", name))),
        None => Err(bad_param(provider, format!("missing parameter '{}'", name))),
    }
}

pub fn required_str<'a>(provider: Provider, params: &'a RequestParams, name: &str) -> Result<&'a str, ProviderError> {
    params
        .get(name)
        .ok_or_else(|| bad_param(provider, format!("missing parameter '{}'", name)))
}

pub fn page_request(provider: Provider, params: &RequestParams) -> Result<PageRequest, ProviderError> {
    let page = optional_u32(provider, params, "page")?.unwrap_or(1).max(1);
    let page_size = optional_u32(provider, params, "page_size")?
        .unwrap_or(DEFAULT_PAGE_SIZE as u32)
        .max(1);
    Ok(PageRequest { page, page_size })
}

fn optional_u32(provider: Provider, params: &RequestParams, name: &str) -> Result<Option<u32>, ProviderError> {
    params
        .get(name)
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| bad_param(provider, format!("parameter '{}' must be numeric", name)))
        })
        .transpose()
}
