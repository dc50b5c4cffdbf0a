//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Quire resolution layer:
//! - Page references and canonical keys (`PageReference`, `NormalizedTitle`)
//! - Store response shapes (`Revision`, `RevisionResult`, `FetchError`)
//! - Read statistics and provenance keys (`ReadStats`, `StorageKey`)
//! - Error types (`QuireError`)
//! - The `PageSource` capability trait
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they are used as keys in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for counters to prevent overflow

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Named template arguments handed down by the renderer.
///
/// The resolver never interprets them; they travel unchanged through redirect
/// hops and into magic word expansion.
pub type TemplateParameters = BTreeMap<String, String>;

// =============================================================================
// PAGE REFERENCES
// =============================================================================

/// A raw, user-supplied page reference.
///
/// Nothing about it has been canonicalized yet. The title may be empty,
/// which makes the reference invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageReference {
    /// Namespace as written by the author (may be an alias, or empty).
    pub namespace: String,
    /// Title as written by the author.
    pub title: String,
}

impl PageReference {
    /// Create a new page reference.
    #[must_use]
    pub fn new(namespace: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            title: title.into(),
        }
    }
}

/// Canonical lookup key for a page.
///
/// Produced only by a `TitleNormalizer`. Two references that denote the same
/// logical page normalize to equal values, so this is the sole cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedTitle {
    namespace: String,
    title: String,
}

impl NormalizedTitle {
    /// Assemble a key from already-canonical parts.
    ///
    /// Callers outside a normalizer should prefer `TitleNormalizer::normalize`.
    #[must_use]
    pub fn from_canonical(namespace: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            title: title.into(),
        }
    }

    /// Canonical namespace name (empty for the main namespace).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Canonical title without its namespace.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display name including the namespace prefix, e.g. `Template:Infobox`.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.title.clone()
        } else {
            format!("{}:{}", self.namespace, self.title)
        }
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.title)
        } else {
            write!(f, "{}:{}", self.namespace, self.title)
        }
    }
}

// =============================================================================
// PROVENANCE & STATISTICS
// =============================================================================

/// A key in the underlying store that was read to answer a request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageKey(pub String);

impl StorageKey {
    /// Create a new storage key.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read cost reported by one or more store round trips.
///
/// Counters only grow; addition saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadStats {
    /// Number of revision fetches issued.
    pub fetches: u64,
    /// Number of fetches that did not yield a revision.
    pub failed_fetches: u64,
    /// Payload bytes read from the store.
    pub bytes_read: u64,
    /// Wall time spent inside the store, in microseconds.
    pub elapsed_micros: u64,
}

impl ReadStats {
    /// Stats for a single fetch.
    #[must_use]
    pub const fn single_fetch(success: bool, bytes_read: u64, elapsed_micros: u64) -> Self {
        Self {
            fetches: 1,
            failed_fetches: if success { 0 } else { 1 },
            bytes_read,
            elapsed_micros,
        }
    }

    /// Component-wise saturating sum.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            fetches: self.fetches.saturating_add(other.fetches),
            failed_fetches: self.failed_fetches.saturating_add(other.failed_fetches),
            bytes_read: self.bytes_read.saturating_add(other.bytes_read),
            elapsed_micros: self.elapsed_micros.saturating_add(other.elapsed_micros),
        }
    }
}

// =============================================================================
// STORE RESPONSE
// =============================================================================

/// The current revision of a page as delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Revision {
    /// Unpacked wikitext of the revision.
    pub text: String,
    /// Whether the page is flagged as a redirect.
    pub is_redirect: bool,
}

impl Revision {
    /// A plain content revision.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_redirect: false,
        }
    }

    /// A revision flagged as a redirect.
    #[must_use]
    pub fn redirect(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_redirect: true,
        }
    }
}

/// Why a fetch did not yield a revision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The store is reachable and confirms the page does not exist.
    #[error("page not found")]
    PageNotFound,

    /// The store did not answer in time.
    #[error("fetch timed out")]
    Timeout,

    /// The store answered with an error.
    #[error("store error: {0}")]
    Store(String),
}

/// Response of `RevisionStore::fetch_revision`.
///
/// Statistics and involved keys are reported for failures too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionResult {
    /// The revision, or why there is none.
    pub outcome: Result<Revision, FetchError>,
    /// Read cost of this fetch.
    pub stats: ReadStats,
    /// Store keys touched by this fetch.
    pub involved_keys: BTreeSet<StorageKey>,
}

impl RevisionResult {
    /// A successful fetch.
    #[must_use]
    pub fn found(
        revision: Revision,
        stats: ReadStats,
        involved_keys: BTreeSet<StorageKey>,
    ) -> Self {
        Self {
            outcome: Ok(revision),
            stats,
            involved_keys,
        }
    }

    /// A failed fetch.
    #[must_use]
    pub fn failed(
        error: FetchError,
        stats: ReadStats,
        involved_keys: BTreeSet<StorageKey>,
    ) -> Self {
        Self {
            outcome: Err(error),
            stats,
            involved_keys,
        }
    }

    /// Whether the fetch produced a revision.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Whether the fetched revision is flagged as a redirect.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.outcome.as_ref().is_ok_and(|r| r.is_redirect)
    }
}

// =============================================================================
// PAGE SOURCE TRAIT
// =============================================================================

/// The capability a renderer depends on to obtain page content.
///
/// `PageResolver` is the in-crate implementation. Magic word handlers receive
/// a `&mut dyn PageSource` as their context, so a handler can itself pull page
/// content through the same session (and the same cache and statistics).
pub trait PageSource {
    /// Classify a template name as a magic word.
    fn is_magic_word(&self, name: &str) -> bool;

    /// Expand a magic word. Only meaningful when `is_magic_word(name)` holds.
    fn expand(&mut self, name: &str, parameters: &str) -> Result<String, QuireError>;

    /// Retrieve the content of a page, following at most one redirect when
    /// `follow_redirect` is set. `None` means "not found".
    fn retrieve_page(
        &mut self,
        namespace: &str,
        title: &str,
        template_parameters: &TemplateParameters,
        follow_redirect: bool,
    ) -> Option<String>;

    /// Canonicalize a reference with the session's normalizer.
    fn normalize(&self, namespace: &str, title: &str) -> Result<NormalizedTitle, QuireError>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Quire system.
///
/// Storage- and reference-level problems are absorbed into "not found" by the
/// resolver; only magic word failures surface to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuireError {
    /// The reference has no usable title.
    #[error("Invalid page reference: {0}")]
    InvalidReference(String),

    /// A magic word handler failed.
    #[error("Magic word '{name}' failed: {reason}")]
    MagicWord { name: String, reason: String },

    /// `expand` was called for a name no handler claims.
    #[error("Unknown magic word: {0}")]
    UnknownMagicWord(String),

    /// The revision store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The configuration is malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================
