//! Purpose: CDX source over a key/value cache holding one ordered set per lookup key.
//! Exports: `SortedSetStore`, `KeyValueCdxSource`, `KeyValueLines`, `DEFAULT_KEY_PREFIX`.
//! Role: Normalizes the query key, reads the whole set, re-prefixes each fragment.
//! Invariants: Only exact-match queries are served; other match types are `Unsupported`.
//! Invariants: The store client is injected; this module never opens connections itself.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::query::{CdxQuery, MatchType};

pub const DEFAULT_KEY_PREFIX: &str = "c:";

/// Ordered-set backend: `range_all` returns every member of `key` in order.
pub trait SortedSetStore: Send + Sync {
    fn range_all(&self, key: &str) -> Result<Vec<String>, Error>;
}

#[derive(Clone)]
pub struct KeyValueCdxSource {
    store: Arc<dyn SortedSetStore>,
    key_prefix: String,
}

impl KeyValueCdxSource {
    pub fn new(store: Arc<dyn SortedSetStore>) -> Self {
        Self {
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Store key for `query`, or why it cannot be served.
    pub fn store_key(&self, query: &CdxQuery) -> Result<String, Error> {
        let match_type = query.effective_match_type();
        if match_type != MatchType::Exact {
            return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                "key/value cdx source only supports exact matchType, got '{match_type}'"
            )));
        }
        let key = normalize_key(&query.key);
        if key.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("cdx query key is empty"));
        }
        Ok(format!("{}{key}", self.key_prefix))
    }

    pub fn load(&self, query: &CdxQuery) -> Result<KeyValueLines, Error> {
        let store_key = self.store_key(query)?;
        tracing::debug!(store_key = %store_key, "reading cdx set");
        let fragments = self.store.range_all(&store_key)?;
        Ok(KeyValueLines {
            key: normalize_key(&query.key).to_string(),
            fragments: fragments.into_iter(),
        })
    }
}

impl fmt::Debug for KeyValueCdxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyValueCdxSource")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for KeyValueCdxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redis CDX Source: {}", self.key_prefix)
    }
}

/// Stored fragments omit the key; each yielded line is `"<key> <fragment>"`.
#[derive(Debug)]
pub struct KeyValueLines {
    key: String,
    fragments: std::vec::IntoIter<String>,
}

impl Iterator for KeyValueLines {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let fragment = self.fragments.next()?;
        Some(Ok(format!("{} {fragment}", self.key)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.fragments.size_hint()
    }
}

impl FusedIterator for KeyValueLines {}

// Keys carry auxiliary fields after the first whitespace; the store indexes the leading token.
fn normalize_key(key: &str) -> &str {
    key.find(char::is_whitespace).map_or(key, |idx| &key[..idx])
}
