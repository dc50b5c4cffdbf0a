//! # redb-backed Revision Store
//!
//! A disk-backed `RevisionStore` using the redb embedded database.
//!
//! Stands in for the distributed store when rendering against a local
//! snapshot. Provides:
//! - ACID transactions (batch imports land atomically)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Pages are keyed by their canonical full name; values are `PageRecord`s in
//! the `formats` encoding. The resolver only reads; the write methods exist
//! for importers.

use super::{RevisionStore, page_key, revision_key};
use crate::formats::{PageRecord, record_from_bytes, record_to_bytes};
use crate::{FetchError, NormalizedTitle, QuireError, ReadStats, RevisionResult};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

/// Table for pages: full page name -> encoded `PageRecord`.
const PAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("pages");

/// A disk-backed revision store.
pub struct RedbRevisionStore {
    db: Database,
}

impl std::fmt::Debug for RedbRevisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRevisionStore").finish_non_exhaustive()
    }
}

impl RedbRevisionStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| QuireError::Storage(e.to_string()))?;
        Self::with_tables(db)
    }

    /// Open a store that must already exist. Never creates a file.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QuireError::Storage(format!(
                "database '{}' does not exist",
                path.display()
            )));
        }
        let db = Database::open(path).map_err(|e| QuireError::Storage(e.to_string()))?;
        Self::with_tables(db)
    }

    fn with_tables(db: Database) -> Result<Self, QuireError> {
        // Initialize the table if it doesn't exist
        let write_txn = db
            .begin_write()
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        let _ = write_txn
            .open_table(PAGES)
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| QuireError::Storage(e.to_string()))?;

        Ok(Self { db })
    }

    /// Store new revisions of several pages in a single ACID transaction.
    ///
    /// Either every page is written or none is. Revision numbers continue from
    /// whatever is already stored for each page.
    pub fn put_pages(
        &mut self,
        pages: &[(NormalizedTitle, String, bool)],
    ) -> Result<Vec<u64>, QuireError> {
        let mut revisions = Vec::with_capacity(pages.len());

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(PAGES)
                .map_err(|e| QuireError::Storage(e.to_string()))?;

            for (title, text, is_redirect) in pages {
                let name = title.full_name();
                let previous = match table
                    .get(name.as_str())
                    .map_err(|e| QuireError::Storage(e.to_string()))?
                {
                    Some(data) => record_from_bytes(data.value())?.revision,
                    None => 0,
                };

                let record =
                    PageRecord::new(previous.saturating_add(1), text.as_str(), *is_redirect);
                let bytes = record_to_bytes(&record)?;
                table
                    .insert(name.as_str(), bytes.as_slice())
                    .map_err(|e| QuireError::Storage(e.to_string()))?;
                revisions.push(record.revision);
            }
        }
        write_txn
            .commit()
            .map_err(|e| QuireError::Storage(e.to_string()))?;

        Ok(revisions)
    }

    /// Number of stored pages.
    pub fn page_count(&self) -> Result<u64, QuireError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(PAGES)
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        table.len().map_err(|e| QuireError::Storage(e.to_string()))
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), QuireError> {
        self.db
            .compact()
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read the raw record bytes of a page.
    fn read_raw(&self, name: &str) -> Result<Option<Vec<u8>>, QuireError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(PAGES)
            .map_err(|e| QuireError::Storage(e.to_string()))?;
        Ok(table
            .get(name)
            .map_err(|e| QuireError::Storage(e.to_string()))?
            .map(|data| data.value().to_vec()))
    }
}

impl RevisionStore for RedbRevisionStore {
    fn fetch_revision(&self, title: &NormalizedTitle) -> RevisionResult {
        let start = Instant::now();
        let mut keys = BTreeSet::from([page_key(title)]);

        let raw = self.read_raw(&title.full_name());
        let elapsed = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        let bytes = match raw {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return RevisionResult::failed(
                    FetchError::PageNotFound,
                    ReadStats::single_fetch(false, 0, elapsed),
                    keys,
                );
            }
            Err(e) => {
                return RevisionResult::failed(
                    FetchError::Store(e.to_string()),
                    ReadStats::single_fetch(false, 0, elapsed),
                    keys,
                );
            }
        };

        let bytes_read = bytes.len() as u64;
        match record_from_bytes(&bytes) {
            Ok(record) => {
                keys.insert(revision_key(title, record.revision));
                RevisionResult::found(
                    record.to_revision(),
                    ReadStats::single_fetch(true, bytes_read, elapsed),
                    keys,
                )
            }
            Err(e) => RevisionResult::failed(
                FetchError::Store(e.to_string()),
                ReadStats::single_fetch(false, bytes_read, elapsed),
                keys,
            ),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(ns: &str, title: &str) -> NormalizedTitle {
        NormalizedTitle::from_canonical(ns, title)
    }

    fn put(store: &mut RedbRevisionStore, title: NormalizedTitle, text: &str) -> u64 {
        let revisions = store
            .put_pages(&[(title, text.to_string(), false)])
            .expect("put");
        revisions[0]
    }

    #[test]
    fn put_then_fetch() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbRevisionStore::open(temp.path().join("pages.redb")).expect("open db");

        put(&mut store, key("", "Berlin"), "Capital");

        let result = store.fetch_revision(&key("", "Berlin"));
        let revision = result.outcome.expect("found");
        assert_eq!(revision.text, "Capital");
        assert!(!revision.is_redirect);
        assert_eq!(result.stats.fetches, 1);
        assert_eq!(result.stats.failed_fetches, 0);
        assert!(result.stats.bytes_read > 0);
        assert!(result.involved_keys.contains(&page_key(&key("", "Berlin"))));
        assert!(result.involved_keys.contains(&revision_key(&key("", "Berlin"), 1)));
    }

    #[test]
    fn missing_page_reports_not_found_with_key() {
        let temp = tempdir().expect("temp dir");
        let store = RedbRevisionStore::open(temp.path().join("pages.redb")).expect("open db");

        let result = store.fetch_revision(&key("Help", "Nothing"));
        assert_eq!(result.outcome, Err(FetchError::PageNotFound));
        assert_eq!(result.stats.failed_fetches, 1);
        assert_eq!(
            result.involved_keys,
            BTreeSet::from([page_key(&key("Help", "Nothing"))])
        );
    }

    #[test]
    fn revisions_increment() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbRevisionStore::open(temp.path().join("pages.redb")).expect("open db");

        assert_eq!(put(&mut store, key("", "A"), "one"), 1);
        assert_eq!(put(&mut store, key("", "A"), "two"), 2);

        let result = store.fetch_revision(&key("", "A"));
        assert!(result.involved_keys.contains(&revision_key(&key("", "A"), 2)));
        assert!(!result.involved_keys.contains(&revision_key(&key("", "A"), 1)));
        assert_eq!(result.outcome.expect("found").text, "two");
        assert_eq!(store.page_count().expect("count"), 1);
    }

    #[test]
    fn batch_import_is_atomic_per_call() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbRevisionStore::open(temp.path().join("pages.redb")).expect("open db");

        let revisions = store
            .put_pages(&[
                (key("", "A"), "#REDIRECT [[B]]".to_string(), true),
                (key("", "B"), "Hello".to_string(), false),
                (key("Template", "Box"), "{{{1}}}".to_string(), false),
            ])
            .expect("batch");

        assert_eq!(revisions, vec![1, 1, 1]);
        assert_eq!(store.page_count().expect("count"), 3);
        assert!(store.fetch_revision(&key("", "A")).is_redirect());
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("pages.redb");

        {
            let mut store = RedbRevisionStore::open(&db_path).expect("open db");
            put(&mut store, key("", "A"), "alpha");
        }

        {
            let store = RedbRevisionStore::open(&db_path).expect("reopen db");
            assert_eq!(store.page_count().expect("count"), 1);
            let result = store.fetch_revision(&key("", "A"));
            assert_eq!(result.outcome.expect("found").text, "alpha");
        }
    }

    #[test]
    fn open_existing_never_creates() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("missing.redb");

        let result = RedbRevisionStore::open_existing(&db_path);
        assert!(matches!(result, Err(QuireError::Storage(_))));
        assert!(!db_path.exists());

        RedbRevisionStore::open(&db_path).expect("create db");
        let store = RedbRevisionStore::open_existing(&db_path).expect("open existing");
        assert_eq!(store.page_count().expect("count"), 0);
    }

    #[test]
    fn compact_keeps_data() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbRevisionStore::open(temp.path().join("pages.redb")).expect("open db");
        put(&mut store, key("", "A"), "alpha");

        store.compact().expect("compact");
        assert!(store.fetch_revision(&key("", "A")).is_success());
    }
}
