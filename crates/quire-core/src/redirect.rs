//! # Redirect Markup
//!
//! Extracts the target of a redirect page such as `#REDIRECT [[Target]]`.
//!
//! The whole text must match: optional leading whitespace, `#`, one of the
//! configured keywords (case-insensitive), an optional `:`, then a link.
//! Section anchors (`[[B#History]]`) and link labels (`[[B|label]]`) are
//! dropped; anything after the link (categories, comments) is ignored.

use crate::QuireError;
use regex::Regex;

/// Matches redirect directives for a fixed set of keywords.
#[derive(Debug, Clone)]
pub struct RedirectParser {
    pattern: Regex,
}

impl RedirectParser {
    /// Build a parser for the given keywords.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, QuireError> {
        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(QuireError::Config(
                "at least one redirect keyword is required".to_string(),
            ));
        }
        Ok(Self {
            pattern: Regex::new(&pattern_source(&keywords))
                .map_err(|e| QuireError::Config(e.to_string()))?,
        })
    }

    /// The raw full name of the redirect target, or `None` if `text` is not a
    /// well-formed redirect.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<String> {
        let target = self.pattern.captures(text)?.get(1)?.as_str().trim();
        if target.is_empty() {
            None
        } else {
            Some(target.to_string())
        }
    }
}

fn pattern_source(keywords: &[&str]) -> String {
    let alternatives = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        r"(?is)^\s*#(?:{})\s*:?\s*\[\[\s*:?([^\]\|#\n]*)(?:#[^\]\|]*)?(?:\|[^\]]*)?\]\].*$",
        alternatives
    )
}

// =============================================================================
// TESTS
// =============================================================================
