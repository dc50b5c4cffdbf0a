//! # Storage Module
//!
//! The outbound seam towards the revision store.
//!
//! The resolver only ever calls `RevisionStore::fetch_revision`, over a handle
//! the caller supplies. Two implementations ship with the crate:
//! - `MemoryRevisionStore`: in-memory pages, fetch counting, injected failures
//! - `RedbRevisionStore`: disk-backed pages in an embedded redb database

mod memory;
mod redb_store;

pub use memory::MemoryRevisionStore;
pub use redb_store::RedbRevisionStore;

use crate::{NormalizedTitle, RevisionResult, StorageKey};

/// Read-only access to the current revision of pages.
///
/// Implementations report statistics and involved keys for every call,
/// including failures. Timeouts are the implementation's business and are
/// reported as `FetchError::Timeout`.
pub trait RevisionStore {
    /// Fetch the current revision of `title`.
    fn fetch_revision(&self, title: &NormalizedTitle) -> RevisionResult;
}

/// Storage key of a page's head entry.
#[must_use]
pub fn page_key(title: &NormalizedTitle) -> StorageKey {
    StorageKey::new(format!("page:{}", title.full_name()))
}

/// Storage key of one revision of a page.
#[must_use]
pub fn revision_key(title: &NormalizedTitle, revision: u64) -> StorageKey {
    StorageKey::new(format!("rev:{}:{}", title.full_name(), revision))
}
