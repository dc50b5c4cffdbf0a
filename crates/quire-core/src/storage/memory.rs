//! # In-Memory Revision Store
//!
//! A volatile `RevisionStore` backed by a `BTreeMap`.
//!
//! Every fetch is counted, which makes the store a convenient probe for
//! checking that the resolver's cache really avoids round trips. Failures
//! can be injected per title to exercise the negative-caching path.

use super::{RevisionStore, page_key, revision_key};
use crate::{FetchError, NormalizedTitle, ReadStats, Revision, RevisionResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory pages with a fetch counter.
#[derive(Debug, Default)]
pub struct MemoryRevisionStore {
    pages: BTreeMap<NormalizedTitle, Revision>,
    failures: BTreeMap<NormalizedTitle, FetchError>,
    fetches: AtomicU64,
}

impl MemoryRevisionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the revision of a page.
    pub fn insert(&mut self, title: NormalizedTitle, revision: Revision) {
        self.pages.insert(title, revision);
    }

    /// Make every fetch of `title` fail with `error`.
    pub fn fail_with(&mut self, title: NormalizedTitle, error: FetchError) {
        self.failures.insert(title, error);
    }

    /// Number of `fetch_revision` calls so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of stored pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the store holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn fetch_revision(&self, title: &NormalizedTitle) -> RevisionResult {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let mut keys = BTreeSet::from([page_key(title)]);

        if let Some(error) = self.failures.get(title) {
            return RevisionResult::failed(
                error.clone(),
                ReadStats::single_fetch(false, 0, 0),
                keys,
            );
        }

        match self.pages.get(title) {
            Some(revision) => {
                keys.insert(revision_key(title, 1));
                RevisionResult::found(
                    revision.clone(),
                    ReadStats::single_fetch(true, revision.text.len() as u64, 0),
                    keys,
                )
            }
            None => RevisionResult::failed(
                FetchError::PageNotFound,
                ReadStats::single_fetch(false, 0, 0),
                keys,
            ),
        }
    }
}
