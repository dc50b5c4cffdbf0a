//! # Page Cache
//!
//! Session-scoped mapping from canonical key to resolution result.
//!
//! - Negative results are cached: a key resolved to "not found" is never
//!   fetched again within the session
//! - No eviction; the cache lives exactly as long as its `PageResolver`
//! - Single writer: every mutation goes through `&mut self`

use crate::NormalizedTitle;
use std::collections::BTreeMap;

/// State of one key in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEntry<'a> {
    /// Resolution was never attempted for this key.
    Unattempted,
    /// Resolution produced content.
    Found(&'a str),
    /// Resolution was attempted and produced nothing.
    NotFound,
}

impl<'a> CacheEntry<'a> {
    /// Whether resolution was already attempted.
    #[must_use]
    pub fn is_attempted(&self) -> bool {
        !matches!(self, Self::Unattempted)
    }

    /// The cached result, or `None` when never attempted.
    #[must_use]
    pub fn resolved(self) -> Option<Option<&'a str>> {
        match self {
            Self::Unattempted => None,
            Self::Found(text) => Some(Some(text)),
            Self::NotFound => Some(None),
        }
    }
}

/// Resolved page content keyed by `NormalizedTitle`.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    entries: BTreeMap<NormalizedTitle, Option<String>>,
}

impl PageCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether resolution was already attempted for `key`.
    #[must_use]
    pub fn has(&self, key: &NormalizedTitle) -> bool {
        self.entries.contains_key(key)
    }

    /// The cached result; `None` if the key was never attempted.
    #[must_use]
    pub fn get(&self, key: &NormalizedTitle) -> Option<Option<&str>> {
        self.lookup(key).resolved()
    }

    /// Tri-state view of `key`.
    #[must_use]
    pub fn lookup(&self, key: &NormalizedTitle) -> CacheEntry<'_> {
        match self.entries.get(key) {
            None => CacheEntry::Unattempted,
            Some(Some(text)) => CacheEntry::Found(text),
            Some(None) => CacheEntry::NotFound,
        }
    }

    /// Record a resolution result, overwriting any previous one.
    pub fn put(&mut self, key: NormalizedTitle, value: Option<String>) {
        self.entries.insert(key, value);
    }

    /// Number of attempted keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was attempted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
