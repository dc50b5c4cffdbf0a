//! # Magic Word Dispatcher
//!
//! Intercepts reserved template names before they reach storage.
//!
//! Each magic word is a `MagicWord` handler registered by name. Expansion gets
//! the session's `PageSource` as context, so a handler can pull page content
//! through the same cache and statistics (e.g. `raw:` transclusion).
//!
//! Magic word output is never written to the page cache; a handler that
//! reads pages goes through `retrieve_page`, which caches those pages under
//! their own keys.

use crate::primitives::{NAMESPACE_SEPARATOR, TEMPLATE_NAMESPACE};
use crate::{NormalizedTitle, PageSource, QuireError, TemplateParameters};
use std::collections::BTreeMap;

// =============================================================================
// HANDLER TRAIT
// =============================================================================

/// One magic word.
///
/// Handlers must be `Send + Sync`: a dispatcher is built once and shared by
/// every rendering session.
pub trait MagicWord: Send + Sync {
    /// The name the handler answers to.
    fn name(&self) -> &str;

    /// Whether `name` must match exactly. Case-insensitive words match any
    /// casing of their name.
    fn case_sensitive(&self) -> bool {
        false
    }

    /// Produce the expansion for `parameters`.
    fn expand(&self, parameters: &str, context: &mut dyn PageSource)
    -> Result<String, QuireError>;
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Registry of magic word handlers.
#[derive(Default)]
pub struct MagicWordDispatcher {
    exact: BTreeMap<String, Box<dyn MagicWord>>,
    folded: BTreeMap<String, Box<dyn MagicWord>>,
}

impl std::fmt::Debug for MagicWordDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicWordDispatcher")
            .field("exact", &self.exact.keys().collect::<Vec<_>>())
            .field("folded", &self.folded.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MagicWordDispatcher {
    /// A dispatcher with no handlers: nothing is a magic word.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher with the built-in handlers registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self::new();
        for kind in [
            CaseKind::Lower,
            CaseKind::Upper,
            CaseKind::LowerFirst,
            CaseKind::UpperFirst,
        ] {
            dispatcher.register(CaseTransform(kind));
        }
        dispatcher.register(UrlEncode);
        dispatcher.register(NamespaceName);
        dispatcher.register(FullPageName);
        dispatcher.register(RawInclude { escape: false });
        dispatcher.register(RawInclude { escape: true });
        dispatcher.register(PageSize);
        dispatcher
    }

    /// Register a handler, replacing any handler with the same name.
    pub fn register<W: MagicWord + 'static>(&mut self, word: W) {
        if word.case_sensitive() {
            self.exact.insert(word.name().to_string(), Box::new(word));
        } else {
            self.folded
                .insert(word.name().to_lowercase(), Box::new(word));
        }
    }

    fn find(&self, name: &str) -> Option<&dyn MagicWord> {
        let name = name.trim();
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&name.to_lowercase()))
            .map(|word| &**word)
    }

    /// Pure classification of a template name.
    #[must_use]
    pub fn is_magic_word(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Expand `name` with `parameters`. Handler failures propagate unchanged.
    pub fn expand(
        &self,
        name: &str,
        parameters: &str,
        context: &mut dyn PageSource,
    ) -> Result<String, QuireError> {
        let word = self
            .find(name)
            .ok_or_else(|| QuireError::UnknownMagicWord(name.to_string()))?;
        tracing::trace!(magic_word = word.name(), "expanding magic word");
        word.expand(parameters, context)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.folded.len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// BUILT-IN HANDLERS
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum CaseKind {
    Lower,
    Upper,
    LowerFirst,
    UpperFirst,
}

/// `lc`, `uc`, `lcfirst`, `ucfirst`.
struct CaseTransform(CaseKind);

impl MagicWord for CaseTransform {
    fn name(&self) -> &str {
        match self.0 {
            CaseKind::Lower => "lc",
            CaseKind::Upper => "uc",
            CaseKind::LowerFirst => "lcfirst",
            CaseKind::UpperFirst => "ucfirst",
        }
    }

    fn expand(&self, parameters: &str, _: &mut dyn PageSource) -> Result<String, QuireError> {
        let mut chars = parameters.chars();
        Ok(match self.0 {
            CaseKind::Lower => parameters.to_lowercase(),
            CaseKind::Upper => parameters.to_uppercase(),
            CaseKind::LowerFirst => match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            },
            CaseKind::UpperFirst => match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            },
        })
    }
}

/// `urlencode`: form encoding, spaces become `+`.
struct UrlEncode;

impl MagicWord for UrlEncode {
    fn name(&self) -> &str {
        "urlencode"
    }

    fn expand(&self, parameters: &str, _: &mut dyn PageSource) -> Result<String, QuireError> {
        Ok(url::form_urlencoded::byte_serialize(parameters.trim().as_bytes()).collect())
    }
}

/// `ns`: canonical name of a namespace given by name or alias.
struct NamespaceName;

impl MagicWord for NamespaceName {
    fn name(&self) -> &str {
        "ns"
    }

    fn expand(&self, parameters: &str, context: &mut dyn PageSource) -> Result<String, QuireError> {
        if parameters.trim().is_empty() {
            return Ok(String::new());
        }
        // Normalizing a placeholder title yields the canonical namespace.
        Ok(context
            .normalize(parameters, "X")
            .map(|key| key.namespace().to_string())
            .unwrap_or_default())
    }
}

/// `fullpagename`: normalized full name; invalid titles expand to nothing.
struct FullPageName;

impl MagicWord for FullPageName {
    fn name(&self) -> &str {
        "fullpagename"
    }

    fn expand(&self, parameters: &str, context: &mut dyn PageSource) -> Result<String, QuireError> {
        Ok(context
            .normalize("", parameters)
            .map(|key| key.full_name())
            .unwrap_or_default())
    }
}

/// `raw` transcludes a template verbatim; `msgnw` additionally escapes it so
/// the wikitext renders literally.
struct RawInclude {
    escape: bool,
}

impl MagicWord for RawInclude {
    fn name(&self) -> &str {
        if self.escape { "msgnw" } else { "raw" }
    }

    fn expand(&self, parameters: &str, context: &mut dyn PageSource) -> Result<String, QuireError> {
        let key = template_key(TEMPLATE_NAMESPACE, parameters, &*context).map_err(|e| {
            QuireError::MagicWord {
                name: self.name().to_string(),
                reason: e.to_string(),
            }
        })?;
        let text =
            context.retrieve_page(key.namespace(), key.title(), &TemplateParameters::new(), true);

        Ok(match text {
            Some(text) if self.escape => escape_wikitext(&text),
            Some(text) => text,
            None => format!("[[{}]]", key),
        })
    }
}

/// `PAGESIZE`: byte length of a page's resolved content, `0` if missing.
struct PageSize;

impl MagicWord for PageSize {
    fn name(&self) -> &str {
        "PAGESIZE"
    }

    fn case_sensitive(&self) -> bool {
        true
    }

    fn expand(&self, parameters: &str, context: &mut dyn PageSource) -> Result<String, QuireError> {
        let key = context
            .normalize("", parameters)
            .map_err(|e| QuireError::MagicWord {
                name: self.name().to_string(),
                reason: e.to_string(),
            })?;
        let size = context
            .retrieve_page(key.namespace(), key.title(), &TemplateParameters::new(), true)
            .map(|text| text.len())
            .unwrap_or(0);
        Ok(size.to_string())
    }
}

/// Where a template reference points.
///
/// Bare names live in `default_namespace`, a leading `:` selects the main
/// namespace, and a known namespace prefix selects its own namespace.
pub(crate) fn template_key(
    default_namespace: &str,
    name: &str,
    source: &dyn PageSource,
) -> Result<NormalizedTitle, QuireError> {
    let name = name.trim();
    let key = source.normalize("", name)?;
    if name.starts_with(NAMESPACE_SEPARATOR) || !key.namespace().is_empty() {
        Ok(key)
    } else {
        source.normalize(default_namespace, name)
    }
}

/// Replace every character with wiki or HTML meaning by its entity.
fn escape_wikitext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '[' => out.push_str("&#91;"),
            ']' => out.push_str("&#93;"),
            '{' => out.push_str("&#123;"),
            '|' => out.push_str("&#124;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
