//! # Title Normalizer
//!
//! Maps a `(namespace, raw title)` pair to its canonical `NormalizedTitle`.
//!
//! - Pure and deterministic: same input, same key
//! - Total over valid input; the only rejection is a structurally empty title
//!   (or one exceeding `MAX_TITLE_LENGTH`)
//!
//! Folding rules belong to the wiki, so normalization sits behind the
//! `TitleNormalizer` trait. `StandardNormalizer` implements the usual
//! MediaWiki-style rules driven by `ResolverConfig`.

use crate::config::{FirstLetterCase, ResolverConfig};
use crate::primitives::{MAX_TITLE_LENGTH, NAMESPACE_SEPARATOR};
use crate::{NormalizedTitle, PageReference, QuireError};
use std::collections::BTreeMap;

// =============================================================================
// NORMALIZER TRAIT
// =============================================================================

/// Canonicalization of page references.
///
/// Implementations must be pure: the resolver relies on equal references
/// producing equal keys for cache correctness.
pub trait TitleNormalizer: Send + Sync {
    /// Canonicalize a reference. Fails only for structurally invalid titles.
    fn normalize(&self, namespace: &str, title: &str) -> Result<NormalizedTitle, QuireError>;

    /// Split a full page name such as `Help:Contents` into namespace and title.
    ///
    /// Only known namespaces are split off; `Foo:Bar` with an unknown `Foo`
    /// stays a main-namespace title.
    fn split_full_name(&self, full_name: &str) -> PageReference;

    /// Canonical name of a namespace given by name or alias.
    fn canonical_namespace(&self, name: &str) -> Option<String>;
}

// =============================================================================
// STANDARD NORMALIZER
// =============================================================================

/// MediaWiki-style title folding.
#[derive(Debug, Clone)]
pub struct StandardNormalizer {
    /// Lowercased name or alias -> canonical namespace name.
    namespaces: BTreeMap<String, String>,
    first_letter_case: FirstLetterCase,
}

impl Default for StandardNormalizer {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl StandardNormalizer {
    /// Build a normalizer from the configured namespace table.
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut namespaces = BTreeMap::new();
        for ns in &config.namespaces {
            let canonical = fold_whitespace(&ns.name);
            for alias in &ns.aliases {
                namespaces.insert(fold_whitespace(alias).to_lowercase(), canonical.clone());
            }
            // Canonical names win over an alias spelled the same way.
            namespaces.insert(canonical.to_lowercase(), canonical);
        }
        Self {
            namespaces,
            first_letter_case: config.first_letter_case,
        }
    }

    fn lookup_namespace(&self, folded: &str) -> Option<&str> {
        self.namespaces
            .get(&folded.to_lowercase())
            .map(String::as_str)
    }

    /// Split `prefix:rest` when `prefix` is a known namespace.
    fn split_known_prefix<'a>(&self, folded: &'a str) -> Option<(&str, &'a str)> {
        let (prefix, rest) = folded.split_once(NAMESPACE_SEPARATOR)?;
        let canonical = self.lookup_namespace(prefix.trim())?;
        Some((canonical, rest))
    }

    fn fold_first_letter(&self, title: &str) -> String {
        match self.first_letter_case {
            FirstLetterCase::Sensitive => title.to_string(),
            FirstLetterCase::Upper => {
                let mut chars = title.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl TitleNormalizer for StandardNormalizer {
    fn normalize(&self, namespace: &str, title: &str) -> Result<NormalizedTitle, QuireError> {
        let folded = fold_whitespace(trim_leading_separators(title));
        if folded.is_empty() {
            return Err(QuireError::InvalidReference(format!(
                "empty title in namespace '{}'",
                namespace
            )));
        }

        let ns_folded = fold_whitespace(namespace);
        let (canonical_ns, rest) = if ns_folded.is_empty() {
            match self.split_known_prefix(&folded) {
                Some((ns, rest)) => {
                    (ns.to_string(), fold_whitespace(trim_leading_separators(rest)))
                }
                None => (String::new(), folded),
            }
        } else {
            let ns = self
                .lookup_namespace(&ns_folded)
                .map(str::to_string)
                .unwrap_or(ns_folded);
            (ns, folded)
        };

        if rest.is_empty() {
            return Err(QuireError::InvalidReference(format!(
                "namespace '{}' without a title",
                canonical_ns
            )));
        }

        let canonical_title = self.fold_first_letter(&rest);
        if canonical_title.len() > MAX_TITLE_LENGTH {
            return Err(QuireError::InvalidReference(format!(
                "title exceeds {} bytes",
                MAX_TITLE_LENGTH
            )));
        }

        Ok(NormalizedTitle::from_canonical(canonical_ns, canonical_title))
    }

    fn split_full_name(&self, full_name: &str) -> PageReference {
        let folded = fold_whitespace(trim_leading_separators(full_name));
        match self.split_known_prefix(&folded) {
            Some((ns, rest)) => {
                PageReference::new(ns, fold_whitespace(trim_leading_separators(rest)))
            }
            None => PageReference::new("", folded),
        }
    }

    fn canonical_namespace(&self, name: &str) -> Option<String> {
        let folded = fold_whitespace(name);
        if folded.is_empty() {
            return Some(String::new());
        }
        self.lookup_namespace(&folded).map(str::to_string)
    }
}

/// Underscores become spaces, whitespace runs collapse, ends are trimmed.
/// Drops leading colons along with any whitespace around them.
fn trim_leading_separators(s: &str) -> &str {
    s.trim_start_matches(|c: char| c == NAMESPACE_SEPARATOR || c == '_' || c.is_whitespace())
}

fn fold_whitespace(s: &str) -> String {
    s.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// TESTS
// =============================================================================
