//! # Resolver Configuration
//!
//! Site-specific knobs for title folding and redirect detection.
//!
//! The configuration is plain data (serde) and is usually read from a TOML
//! file by the host application:
//!
//! ```toml
//! first_letter_case = "upper"
//! redirect_keywords = ["REDIRECT", "WEITERLEITUNG"]
//!
//! [[namespaces]]
//! name = "File"
//! aliases = ["Image"]
//! ```

use crate::QuireError;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// TYPES
// =============================================================================

/// How the first letter of a title is folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirstLetterCase {
    /// `foo` and `Foo` are the same page.
    #[default]
    Upper,
    /// Titles are case-sensitive throughout.
    Sensitive,
}

/// One namespace known to the wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Canonical name, used in normalized keys.
    pub name: String,
    /// Alternative spellings folded onto the canonical name.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl NamespaceConfig {
    /// Create a namespace entry.
    #[must_use]
    pub fn new(name: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// Configuration for a `PageResolver` session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// First-letter folding rule for titles.
    pub first_letter_case: FirstLetterCase,
    /// Localised redirect keywords, matched case-insensitively after `#`.
    pub redirect_keywords: Vec<String>,
    /// Whether `transclude` follows a redirect hop.
    pub follow_redirects: bool,
    /// Namespaces other than the main namespace.
    pub namespaces: Vec<NamespaceConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            first_letter_case: FirstLetterCase::Upper,
            redirect_keywords: vec![crate::primitives::DEFAULT_REDIRECT_KEYWORD.to_string()],
            follow_redirects: true,
            namespaces: vec![
                NamespaceConfig::new("Talk", &[]),
                NamespaceConfig::new("User", &[]),
                NamespaceConfig::new("User talk", &[]),
                NamespaceConfig::new("Project", &["Wikipedia"]),
                NamespaceConfig::new("File", &["Image"]),
                NamespaceConfig::new("MediaWiki", &[]),
                NamespaceConfig::new("Template", &[]),
                NamespaceConfig::new("Help", &[]),
                NamespaceConfig::new("Category", &[]),
                NamespaceConfig::new("Special", &[]),
            ],
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl ResolverConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, QuireError> {
        let config: Self =
            toml::from_str(source).map_err(|e| QuireError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path).map_err(|e| {
            QuireError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Check structural consistency.
    pub fn validate(&self) -> Result<(), QuireError> {
        if self.redirect_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(QuireError::Config(
                "at least one redirect keyword is required".to_string(),
            ));
        }
        for ns in &self.namespaces {
            if ns.name.trim().is_empty() {
                return Err(QuireError::Config(
                    "namespace names must not be empty".to_string(),
                ));
            }
            if ns.name.contains(crate::primitives::NAMESPACE_SEPARATOR) {
                return Err(QuireError::Config(format!(
                    "namespace '{}' contains a separator",
                    ns.name
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
