//! # Stats Accumulator
//!
//! Read statistics and involved storage keys for one rendering session.
//!
//! Accumulation is monotonic: there is no removal. The resolver threads one
//! accumulator by `&mut` through a redirect hop, so the hop's read cost is
//! attributed to the request that caused it.

use crate::{ReadStats, RevisionResult, StorageKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Monotonic totals of what a session read from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    stats: ReadStats,
    involved_keys: BTreeSet<StorageKey>,
}

impl StatsAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the cost of one or more reads.
    pub fn add_stats(&mut self, delta: ReadStats) {
        self.stats = self.stats.saturating_add(delta);
    }

    /// Add storage keys that were touched.
    pub fn add_involved_keys<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = StorageKey>,
    {
        self.involved_keys.extend(keys);
    }

    /// Record everything a fetch reported, whether it succeeded or not.
    pub fn record(&mut self, result: &RevisionResult) {
        self.add_stats(result.stats);
        self.add_involved_keys(result.involved_keys.iter().cloned());
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: Self) {
        self.add_stats(other.stats);
        self.add_involved_keys(other.involved_keys);
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Keys touched so far, in deterministic order.
    #[must_use]
    pub fn involved_keys(&self) -> &BTreeSet<StorageKey> {
        &self.involved_keys
    }

    /// Split into the two totals.
    #[must_use]
    pub fn into_parts(self) -> (ReadStats, BTreeSet<StorageKey>) {
        (self.stats, self.involved_keys)
    }
}

// =============================================================================
// TESTS
// =============================================================================
