//! Request parameters for provider resources

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Named request parameters, held sorted so insertion order never matters.
///
/// Names are trimmed and lower-cased and values trimmed on insert. Pairs
/// whose value is empty after trimming are dropped, so `?id=` behaves like a
/// missing `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::new();
        for (name, value) in pairs {
            params.insert(name.as_ref(), value.as_ref());
        }
        params
    }

    /// Like [`from_pairs`](Self::from_pairs), but a name given twice (after
    /// trimming and case-folding) is an error instead of last-one-wins.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::new();
        let mut seen = std::collections::BTreeSet::new();
        for (name, value) in pairs {
            let normalized = name.as_ref().trim().to_ascii_lowercase();
            if !normalized.is_empty() && !seen.insert(normalized.clone()) {
                return Err(ValidationError::DuplicateParameter { name: normalized });
            }
            params.insert(&normalized, value.as_ref());
        }
        Ok(params)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.insert(name, &value.to_string());
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return;
        }
        self.0.insert(name, value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a numeric parameter, `None` when absent.
    pub fn get_u64(&self, name: &str) -> Option<Result<u64, std::num::ParseIntError>> {
        self.get(name).map(str::parse::<u64>)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
