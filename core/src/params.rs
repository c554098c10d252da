//! Request parameters and API URI assembly.
//!
//! MediaWiki takes every argument as a flat string-to-string form field.
//! `Params` keeps them in key order so request bodies are deterministic,
//! which keeps the test vectors stable.

use std::collections::btree_map::{self, BTreeMap};

use url::form_urlencoded;
use url::Url;

use crate::error::{MediaWikiError, Result};

/// Ordered map of API parameter names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.inner.iter()
    }

    /// Serialize as an `application/x-www-form-urlencoded` body.
    pub fn to_form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.inner.iter())
            .finish()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Assemble `<scheme>://<host>:<port><path>` into an API endpoint URL.
///
/// A `path` without a leading slash gets one. Default ports
/// (80 for http, 443 for https) are dropped by the URL normalizer.
pub fn build_api_uri(scheme: &str, host: &str, port: u16, path: &str) -> Result<Url> {
    if scheme.is_empty() {
        return Err(MediaWikiError::InvalidArgument("scheme is empty".to_string()));
    }
    if host.is_empty() {
        return Err(MediaWikiError::InvalidArgument("host is empty".to_string()));
    }
    let separator = if path.starts_with('/') { "" } else { "/" };
    let raw = format!("{scheme}://{host}:{port}{separator}{path}");
    Url::parse(&raw).map_err(|e| MediaWikiError::InvalidArgument(format!("{raw}: {e}")))
}
