//! Cache key scheme.
//!
//! `build_key` is the only constructor of [`CacheKey`]. Keys read back from a
//! store go through [`CacheKey::parse`], which re-derives the key from its
//! components and accepts it only when the result is byte-identical, so a
//! non-canonical key can never be represented.
//!
//! # Format
//!
//! `{provider}:{kind}:{ident}` followed by `:{name}={value}&...` for the
//! remaining parameters in sorted order. Reserved characters (`%`, `:`, `&`,
//! `=`) inside components are percent-escaped.
//!
//! ```text
//! rawg:detail:1042
//! rawg:search:the witcher:page=1&page_size=20
//! igdb:trending:all:page=2&page_size=40
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::enums::{CacheType, Provider, ResourceKind};
use crate::error::ValidationError;
use crate::params::RequestParams;

/// Largest page size any provider accepts.
pub const MAX_PAGE_SIZE: u64 = 40;

/// Page size applied when a paged request leaves it out.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Highest page number a provider request can carry.
pub const MAX_PAGE: u64 = u32::MAX as u64;

/// Identifier segment used by kinds with no natural identifier.
const ALL_IDENT: &str = "all";

/// Where the identifier segment of a key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentSource {
    /// Numeric `id` parameter.
    Id,
    /// Free-text `q` parameter, case-folded and whitespace-collapsed.
    Query,
    /// `user` parameter, case-folded.
    User,
    /// Fixed segment.
    Fixed,
}

impl IdentSource {
    fn param_name(&self) -> Option<&'static str> {
        match self {
            IdentSource::Id => Some("id"),
            IdentSource::Query => Some("q"),
            IdentSource::User => Some("user"),
            IdentSource::Fixed => None,
        }
    }
}

struct KindRules {
    ident: IdentSource,
    paged: bool,
}

fn rules_for(kind: ResourceKind) -> KindRules {
    match kind {
        ResourceKind::Detail | ResourceKind::Videos => KindRules {
            ident: IdentSource::Id,
            paged: false,
        },
        ResourceKind::Series | ResourceKind::Screenshots => KindRules {
            ident: IdentSource::Id,
            paged: true,
        },
        ResourceKind::Search => KindRules {
            ident: IdentSource::Query,
            paged: true,
        },
        ResourceKind::Trending => KindRules {
            ident: IdentSource::Fixed,
            paged: true,
        },
        ResourceKind::ProfileStats => KindRules {
            ident: IdentSource::User,
            paged: false,
        },
    }
}

/// A validated, canonical cache key.
///
/// Carries the normalized parameters it was derived from (defaults applied),
/// which is what provider adapters are called with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey {
    inner: CacheKeyInner,
}

/// Private inner data - cannot be constructed outside this module.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKeyInner {
    raw: String,
    provider: Provider,
    kind: ResourceKind,
    params: RequestParams,
}

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.inner.raw
    }

    pub fn provider(&self) -> Provider {
        self.inner.provider
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn cache_type(&self) -> CacheType {
        self.inner.kind.cache_type()
    }

    /// Normalized request parameters, defaults applied.
    pub fn params(&self) -> &RequestParams {
        &self.inner.params
    }

    /// Parse a key previously produced by [`build_key`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidKey {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(invalid("expected provider:kind:ident[:params]"));
        }

        let provider: Provider = parts[0]
            .parse()
            .map_err(|_| invalid("unknown provider"))?;
        let kind: ResourceKind = parts[1]
            .parse()
            .map_err(|_| invalid("unknown resource kind"))?;
        let ident = unescape(parts[2]).ok_or_else(|| invalid("bad escape in identifier"))?;

        let mut params = RequestParams::new();
        match rules_for(kind).ident.param_name() {
            Some(name) => params.insert(name, &ident),
            None if ident == ALL_IDENT => {}
            None => return Err(invalid("unexpected identifier")),
        }

        if let Some(rest) = parts.get(3) {
            for pair in rest.split('&') {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| invalid("parameter without value"))?;
                let value = unescape(value).ok_or_else(|| invalid("bad escape in parameter"))?;
                params.insert(name, &value);
            }
        }

        let (key, _) = build_key(provider, kind, &params)?;
        if key.as_str() != raw {
            return Err(invalid("not in canonical form"));
        }
        Ok(key)
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.raw.hash(state);
    }
}

impl PartialOrd for CacheKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CacheKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.raw.cmp(&other.inner.raw)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.raw)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.inner.raw
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.inner.raw
    }
}

impl TryFrom<String> for CacheKey {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        CacheKey::parse(&raw)
    }
}

/// Derive the cache key and cache type for a logical request.
///
/// Pure. Parameter order never matters. Fails when a required parameter is
/// missing, a numeric parameter is malformed or out of range, or a parameter
/// is not recognized for `kind`.
pub fn build_key(
    provider: Provider,
    kind: ResourceKind,
    params: &RequestParams,
) -> Result<(CacheKey, CacheType), ValidationError> {
    let rules = rules_for(kind);

    for (name, _) in params.iter() {
        let is_ident = rules.ident.param_name() == Some(name);
        let is_paging = rules.paged && (name == "page" || name == "page_size");
        if !is_ident && !is_paging {
            return Err(ValidationError::UnknownParameter {
                kind,
                name: name.to_string(),
            });
        }
    }

    let mut normalized = RequestParams::new();
    let ident = match rules.ident {
        IdentSource::Id => {
            let id = required_u64(params, "id")?;
            let id = id.to_string();
            normalized.insert("id", &id);
            id
        }
        IdentSource::Query => {
            let q = params
                .get("q")
                .map(normalize_query)
                .filter(|q| !q.is_empty())
                .ok_or_else(|| missing("q"))?;
            normalized.insert("q", &q);
            q
        }
        IdentSource::User => {
            let user = params
                .get("user")
                .map(|u| u.to_lowercase())
                .ok_or_else(|| missing("user"))?;
            check_user(&user)?;
            normalized.insert("user", &user);
            user
        }
        IdentSource::Fixed => ALL_IDENT.to_string(),
    };

    let mut raw = format!("{}:{}:{}", provider.as_str(), kind.as_str(), escape(&ident));

    if rules.paged {
        let page = optional_u64(params, "page")?.unwrap_or(1);
        if page == 0 || page > MAX_PAGE {
            return Err(out_of_range("page", "must be between 1 and 4294967295"));
        }
        let page_size = optional_u64(params, "page_size")?.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(out_of_range("page_size", "must be between 1 and 40"));
        }
        normalized.insert("page", &page.to_string());
        normalized.insert("page_size", &page_size.to_string());
    }

    let ident_name = rules.ident.param_name();
    let rest: Vec<String> = normalized
        .iter()
        .filter(|(name, _)| Some(*name) != ident_name)
        .map(|(name, value)| format!("{}={}", name, escape(value)))
        .collect();
    if !rest.is_empty() {
        raw.push(':');
        raw.push_str(&rest.join("&"));
    }

    let key = CacheKey {
        inner: CacheKeyInner {
            raw,
            provider,
            kind,
            params: normalized,
        },
    };
    Ok((key, kind.cache_type()))
}

/// Case-fold and collapse runs of whitespace.
fn normalize_query(q: &str) -> String {
    q.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A user name becomes one upstream path segment; it may not carry path or
/// URL structure of its own.
fn check_user(user: &str) -> Result<(), ValidationError> {
    if user.contains(['/', '\\', '?', '#']) || user.contains("..") || user.chars().any(char::is_control) {
        return Err(ValidationError::InvalidValue {
            field: "user".to_string(),
            reason: format!("'{}' is not a valid user name", user),
        });
    }
    Ok(())
}

fn missing(field: &str) -> ValidationError {
    ValidationError::RequiredFieldMissing {
        field: field.to_string(),
    }
}

fn out_of_range(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn optional_u64(params: &RequestParams, name: &str) -> Result<Option<u64>, ValidationError> {
    match params.get_u64(name) {
        None => Ok(None),
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(_)) => Err(ValidationError::InvalidValue {
            field: name.to_string(),
            reason: format!("'{}' is not a non-negative integer", params.get(name).unwrap_or_default()),
        }),
    }
}

fn required_u64(params: &RequestParams, name: &str) -> Result<u64, ValidationError> {
    optional_u64(params, name)?.ok_or_else(|| missing(name))
}

fn escape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for c in component.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(component: &str) -> Option<String> {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let hex: String = chars.by_ref().take(2).collect();
        match hex.as_str() {
            "25" => out.push('%'),
            "3A" => out.push(':'),
            "26" => out.push('&'),
            "3D" => out.push('='),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(provider: Provider, kind: ResourceKind, pairs: &[(&str, &str)]) -> Result<CacheKey, ValidationError> {
        build_key(provider, kind, &RequestParams::from_pairs(pairs.iter().copied())).map(|(k, _)| k)
    }

    #[test]
    fn test_detail_key_format() {
        let (k, cache_type) = build_key(
            Provider::Rawg,
            ResourceKind::Detail,
            &RequestParams::new().with("id", 1042),
        )
        .expect("valid request");
        assert_eq!(k.as_str(), "rawg:detail:1042");
        assert_eq!(cache_type, CacheType::GameDetail);
        assert_eq!(k.params().get("id"), Some("1042"));
    }

    #[test]
    fn test_search_key_normalizes_query_and_applies_paging_defaults() {
        let k = key(Provider::Rawg, ResourceKind::Search, &[("q", "  The   Witcher ")]).expect("valid");
        assert_eq!(k.as_str(), "rawg:search:the witcher:page=1&page_size=20");
        assert_eq!(k.params().get("page"), Some("1"));
    }

    #[test]
    fn test_page_one_equals_missing_page() {
        let a = key(Provider::Igdb, ResourceKind::Trending, &[]).expect("valid");
        let b = key(Provider::Igdb, ResourceKind::Trending, &[("page", "1")]).expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "igdb:trending:all:page=1&page_size=20");
    }

    #[test]
    fn test_parameter_order_does_not_matter() {
        let a = key(Provider::Rawg, ResourceKind::Series, &[("id", "7"), ("page", "2"), ("page_size", "10")]).expect("valid");
        let b = key(Provider::Rawg, ResourceKind::Series, &[("page_size", "10"), ("PAGE", "2"), ("id", "007")]).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_id_different_kind_or_provider_differs() {
        let detail = key(Provider::Rawg, ResourceKind::Detail, &[("id", "1")]).expect("valid");
        let videos = key(Provider::Rawg, ResourceKind::Videos, &[("id", "1")]).expect("valid");
        let igdb = key(Provider::Igdb, ResourceKind::Detail, &[("id", "1")]).expect("valid");
        assert_ne!(detail, videos);
        assert_ne!(detail, igdb);
    }

    #[test]
    fn test_missing_required_params() {
        assert_eq!(
            key(Provider::Rawg, ResourceKind::Detail, &[]),
            Err(ValidationError::RequiredFieldMissing { field: "id".to_string() })
        );
        assert_eq!(
            key(Provider::Rawg, ResourceKind::Search, &[("q", "   ")]),
            Err(ValidationError::RequiredFieldMissing { field: "q".to_string() })
        );
        assert_eq!(
            key(Provider::Rawg, ResourceKind::ProfileStats, &[]),
            Err(ValidationError::RequiredFieldMissing { field: "user".to_string() })
        );
    }

    #[test]
    fn test_numeric_validation() {
        assert!(matches!(
            key(Provider::Rawg, ResourceKind::Detail, &[("id", "abc")]),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            key(Provider::Rawg, ResourceKind::Detail, &[("id", "-4")]),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            key(Provider::Rawg, ResourceKind::Trending, &[("page", "0")]),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            key(Provider::Rawg, ResourceKind::Trending, &[("page_size", "41")]),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(key(Provider::Rawg, ResourceKind::Trending, &[("page_size", "40")]).is_ok());
    }

    #[test]
    fn test_page_bounded_to_provider_range() {
        assert!(key(Provider::Rawg, ResourceKind::Trending, &[("page", "4294967295")]).is_ok());
        assert!(matches!(
            key(Provider::Rawg, ResourceKind::Trending, &[("page", "4294967296")]),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            key(Provider::Igdb, ResourceKind::Search, &[("q", "zelda"), ("page", "18446744073709551615")]),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_user_cannot_carry_path_structure() {
        for user in ["../games/1042#", "a/b", "ada?page=2", "ada#x", "..", "a\\b"] {
            assert!(
                matches!(
                    key(Provider::Rawg, ResourceKind::ProfileStats, &[("user", user)]),
                    Err(ValidationError::InvalidValue { .. })
                ),
                "accepted {:?}",
                user
            );
        }
        assert!(key(Provider::Rawg, ResourceKind::ProfileStats, &[("user", "Ada.Lovelace")]).is_ok());
        assert!(CacheKey::parse("rawg:profile-stats:..").is_err());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        assert_eq!(
            key(Provider::Rawg, ResourceKind::Detail, &[("id", "1"), ("page", "2")]),
            Err(ValidationError::UnknownParameter {
                kind: ResourceKind::Detail,
                name: "page".to_string(),
            })
        );
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let k = key(Provider::Rawg, ResourceKind::Search, &[("q", "halo: reach & more=100%")]).expect("valid");
        assert_eq!(
            k.as_str(),
            "rawg:search:halo%3A reach %26 more%3D100%25:page=1&page_size=20"
        );
        assert_eq!(CacheKey::parse(k.as_str()), Ok(k.clone()));
        assert_eq!(k.params().get("q"), Some("halo: reach & more=100%"));
    }

    #[test]
    fn test_parse_round_trip() {
        for raw in [
            "rawg:detail:1042",
            "igdb:trending:all:page=3&page_size=40",
            "rawg:profile-stats:gamer42",
            "rawg:screenshots:99:page=1&page_size=20",
        ] {
            let parsed = CacheKey::parse(raw).expect("canonical key");
            assert_eq!(parsed.as_str(), raw);
        }
    }

    #[test]
    fn test_parse_rejects_non_canonical_or_garbage() {
        for raw in [
            "",
            "rawg",
            "rawg:detail",
            "steam:detail:1",
            "rawg:reviews:1",
            "rawg:detail:0042",
            "rawg:search:zelda",
            "rawg:trending:everything:page=1&page_size=20",
            "rawg:detail:1:page=1",
            "rawg:search:bad%zz:page=1&page_size=20",
        ] {
            assert!(CacheKey::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let k = key(Provider::Rawg, ResourceKind::Detail, &[("id", "5")]).expect("valid");
        let json = serde_json::to_string(&k).expect("serialize");
        assert_eq!(json, "\"rawg:detail:5\"");
        let back: CacheKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, k);
        assert!(serde_json::from_str::<CacheKey>("\"nope\"").is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Shuffling parameter order never changes the key.
        #[test]
        fn prop_key_ignores_param_order(
            q in "[a-zA-Z0-9 :&=%]{1,24}",
            page in 1u64..500,
            page_size in 1u64..=40,
            reverse in any::<bool>(),
        ) {
            let mut pairs = vec![
                ("q".to_string(), q),
                ("page".to_string(), page.to_string()),
                ("page_size".to_string(), page_size.to_string()),
            ];
            let forward = RequestParams::from_pairs(pairs.clone());
            if reverse {
                pairs.reverse();
            } else {
                pairs.rotate_left(1);
            }
            let shuffled = RequestParams::from_pairs(pairs);

            let a = build_key(Provider::Rawg, ResourceKind::Search, &forward);
            let b = build_key(Provider::Rawg, ResourceKind::Search, &shuffled);
            prop_assert_eq!(a.clone(), b);

            if let Ok((key, _)) = a {
                prop_assert_eq!(CacheKey::parse(key.as_str()), Ok(key.clone()));
            }
        }

        /// Distinct ids never share a key.
        #[test]
        fn prop_distinct_ids_distinct_keys(a in any::<u64>(), b in any::<u64>()) {
            let ka = build_key(Provider::Igdb, ResourceKind::Detail, &RequestParams::new().with("id", a));
            let kb = build_key(Provider::Igdb, ResourceKind::Detail, &RequestParams::new().with("id", b));
            let (ka, _) = ka.expect("valid id");
            let (kb, _) = kb.expect("valid id");
            prop_assert_eq!(a == b, ka == kb);
        }
    }
}
