//! # quire-core
//!
//! The page-resolution and caching layer of the Quire wiki renderer.
//!
//! Sits between the markup renderer and the revision store. Whenever the
//! renderer needs another page's content (a transcluded template, a raw
//! include, a redirect target) it asks a `PageResolver`, which:
//! - normalizes the reference to a canonical key
//! - answers from a per-session cache when it can (including "not found")
//! - otherwise fetches the current revision, following at most one redirect
//! - accumulates read statistics and involved storage keys for the session
//!
//! Magic words (`{{lc:...}}`, `{{raw:...}}`, ...) are routed to the
//! `MagicWordDispatcher` before any page lookup happens.
//!
//! ## Constraints
//!
//! - One resolver per rendering session; no internal locking
//! - Deterministic: ordered collections only, no floating point
//! - No async, no network dependencies; the store is a caller-supplied handle

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod config;
pub mod formats;
pub mod magic;
pub mod primitives;
pub mod redirect;
pub mod resolver;
pub mod stats;
pub mod storage;
pub mod title;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    FetchError, NormalizedTitle, PageReference, PageSource, QuireError, ReadStats, Revision,
    RevisionResult, StorageKey, TemplateParameters,
};

// =============================================================================
// RE-EXPORTS: Resolution
// =============================================================================

pub use cache::{CacheEntry, PageCache};
pub use config::{FirstLetterCase, NamespaceConfig, ResolverConfig};
pub use magic::{MagicWord, MagicWordDispatcher};
pub use redirect::RedirectParser;
pub use resolver::{PageResolver, Resolution};
pub use stats::StatsAccumulator;
pub use title::{StandardNormalizer, TitleNormalizer};

// =============================================================================
// RE-EXPORTS: Storage and Formats
// =============================================================================

pub use formats::{PageRecord, record_from_bytes, record_to_bytes};
pub use storage::{MemoryRevisionStore, RedbRevisionStore, RevisionStore, page_key, revision_key};
