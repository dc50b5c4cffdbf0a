//! # Retrieval Engine
//!
//! `PageResolver` turns page references into page text for one rendering
//! session:
//!
//! ```text
//! normalize -> cache check -> fetch -> (one redirect hop) -> cache write
//! ```
//!
//! - A cache hit short-circuits everything, including statistics
//! - A missing store connection yields "not found" and is NOT cached, so a
//!   later call with a connection can still succeed
//! - Fetch failures ARE cached: a failed lookup is not retried in-session
//! - At most one redirect hop: the hop is resolved with `follow_redirect`
//!   off, which terminates even on cyclic redirect data
//! - A redirect whose target cannot be parsed is disarmed: the renderer gets
//!   "not found" and the raw markup goes to the operator log instead
//!
//! Magic words are intercepted by `transclude` before any of the above, and
//! never cached as pages.

use crate::cache::PageCache;
use crate::config::ResolverConfig;
use crate::magic::{MagicWordDispatcher, template_key};
use crate::primitives::{NAMESPACE_SEPARATOR, redirect_notice};
use crate::redirect::RedirectParser;
use crate::stats::StatsAccumulator;
use crate::storage::RevisionStore;
use crate::title::{StandardNormalizer, TitleNormalizer};
use crate::{
    FetchError, NormalizedTitle, PageSource, QuireError, ReadStats, StorageKey,
    TemplateParameters,
};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// RESOLUTION OUTCOME
// =============================================================================

/// How a single resolution request ended.
///
/// `retrieve_page` collapses this to `Option<String>`; callers that need to
/// tell a store error from a confirmed absence use `resolve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Answered from the session cache without touching the store.
    Cached(Option<String>),
    /// Fetched content.
    Found(String),
    /// Fetched a redirect and transcluded its target's content.
    Redirected { target: String, text: String },
    /// Fetched a redirect whose target has no content; the text is a notice
    /// linking to the target.
    DanglingRedirect(String),
    /// The store confirms the page does not exist.
    NotFound,
    /// The store failed or timed out.
    FetchFailed(FetchError),
    /// No store connection is configured.
    NoConnection,
    /// The reference has no usable title.
    InvalidReference,
    /// The page is flagged as a redirect but its target could not be parsed.
    RedirectDisarmed,
}

impl Resolution {
    /// The text handed to the renderer, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Cached(text) => text.as_deref(),
            Self::Found(text) | Self::Redirected { text, .. } | Self::DanglingRedirect(text) => {
                Some(text)
            }
            Self::NotFound
            | Self::FetchFailed(_)
            | Self::NoConnection
            | Self::InvalidReference
            | Self::RedirectDisarmed => None,
        }
    }

    /// Consume into the renderer-facing text.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Cached(text) => text,
            Self::Found(text) | Self::Redirected { text, .. } | Self::DanglingRedirect(text) => {
                Some(text)
            }
            Self::NotFound
            | Self::FetchFailed(_)
            | Self::NoConnection
            | Self::InvalidReference
            | Self::RedirectDisarmed => None,
        }
    }

    /// Short machine-readable name of the outcome.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Found(_) => "found",
            Self::Redirected { .. } => "redirected",
            Self::DanglingRedirect(_) => "dangling_redirect",
            Self::NotFound => "not_found",
            Self::FetchFailed(_) => "fetch_failed",
            Self::NoConnection => "no_connection",
            Self::InvalidReference => "invalid_reference",
            Self::RedirectDisarmed => "redirect_disarmed",
        }
    }
}

// =============================================================================
// PAGE RESOLVER
// =============================================================================

/// The retrieval engine for one rendering session.
///
/// Owns the session's `PageCache` and `StatsAccumulator`; borrows the store
/// connection read-only. Every resolving operation takes `&mut self`, so one
/// resolver cannot be shared between concurrent renders; give each render
/// its own.
pub struct PageResolver<'s> {
    normalizer: Arc<dyn TitleNormalizer>,
    dispatcher: Arc<MagicWordDispatcher>,
    redirects: RedirectParser,
    follow_redirects: bool,
    connection: Option<&'s dyn RevisionStore>,
    cache: PageCache,
    stats: StatsAccumulator,
}

impl std::fmt::Debug for PageResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageResolver")
            .field("connected", &self.connection.is_some())
            .field("cached_pages", &self.cache.len())
            .field("stats", &self.stats.stats())
            .finish_non_exhaustive()
    }
}

impl<'s> PageResolver<'s> {
    /// Create a session from configuration with the built-in magic words.
    pub fn new(
        config: &ResolverConfig,
        connection: Option<&'s dyn RevisionStore>,
    ) -> Result<Self, QuireError> {
        config.validate()?;
        Ok(Self {
            normalizer: Arc::new(StandardNormalizer::from_config(config)),
            dispatcher: Arc::new(MagicWordDispatcher::with_builtins()),
            redirects: RedirectParser::new(&config.redirect_keywords)?,
            follow_redirects: config.follow_redirects,
            connection,
            cache: PageCache::new(),
            stats: StatsAccumulator::new(),
        })
    }

    /// Replace the title normalizer.
    ///
    /// Only sensible before the first resolution; cached keys were produced by
    /// the previous normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn TitleNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replace the magic word dispatcher (shared between sessions).
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<MagicWordDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Attach, replace or drop the store connection.
    pub fn set_connection(&mut self, connection: Option<&'s dyn RevisionStore>) {
        self.connection = connection;
    }

    /// Whether a store connection is configured.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Resolve a page, accumulating into the session's own statistics.
    pub fn resolve(
        &mut self,
        namespace: &str,
        title: &str,
        template_parameters: &TemplateParameters,
        follow_redirect: bool,
    ) -> Resolution {
        let mut stats = std::mem::take(&mut self.stats);
        let resolution =
            self.resolve_with(namespace, title, template_parameters, follow_redirect, &mut stats);
        self.stats = stats;
        resolution
    }

    /// Resolve a page, accumulating into an explicit accumulator.
    ///
    /// The same accumulator is threaded through the redirect hop.
    pub fn resolve_with(
        &mut self,
        namespace: &str,
        title: &str,
        template_parameters: &TemplateParameters,
        follow_redirect: bool,
        stats: &mut StatsAccumulator,
    ) -> Resolution {
        if title.is_empty() {
            return Resolution::InvalidReference;
        }

        let key = match self.normalizer.normalize(namespace, title) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(namespace, title, error = %e, "rejected page reference");
                return Resolution::InvalidReference;
            }
        };

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(page = %key, "page cache hit");
            return Resolution::Cached(cached.map(str::to_string));
        }

        let Some(store) = self.connection else {
            tracing::debug!(page = %key, "no store connection, page not resolved");
            return Resolution::NoConnection;
        };

        let result = store.fetch_revision(&key);
        stats.record(&result);

        let resolution = match result.outcome {
            Err(FetchError::PageNotFound) => Resolution::NotFound,
            Err(e) => {
                tracing::debug!(page = %key, error = %e, "revision fetch failed");
                Resolution::FetchFailed(e)
            }
            Ok(revision) if follow_redirect && revision.is_redirect => {
                self.follow_redirect(&key, &revision.text, template_parameters, stats)
            }
            Ok(revision) => Resolution::Found(revision.text),
        };

        self.cache.put(key, resolution.text().map(str::to_string));
        resolution
    }

    /// `retrieve_page` with an explicit accumulator.
    pub fn retrieve_page_with(
        &mut self,
        namespace: &str,
        title: &str,
        template_parameters: &TemplateParameters,
        follow_redirect: bool,
        stats: &mut StatsAccumulator,
    ) -> Option<String> {
        self.resolve_with(namespace, title, template_parameters, follow_redirect, stats)
            .into_text()
    }

    /// Resolve the single redirect hop of `key`, whose content is `text`.
    fn follow_redirect(
        &mut self,
        key: &NormalizedTitle,
        text: &str,
        template_parameters: &TemplateParameters,
        stats: &mut StatsAccumulator,
    ) -> Resolution {
        let Some(target) = self.redirects.parse(text) else {
            tracing::warn!(
                page = %key,
                text,
                "could not parse redirect target, redirect disarmed"
            );
            return Resolution::RedirectDisarmed;
        };

        let target_ref = self.normalizer.split_full_name(&target);
        let display_name = self
            .normalizer
            .normalize(&target_ref.namespace, &target_ref.title)
            .map(|t| t.full_name())
            .unwrap_or(target);

        let target_text = self
            .resolve_with(
                &target_ref.namespace,
                &target_ref.title,
                template_parameters,
                false,
                stats,
            )
            .into_text();

        match target_text {
            Some(text) if !text.is_empty() => Resolution::Redirected {
                target: display_name,
                text,
            },
            _ => Resolution::DanglingRedirect(redirect_notice(&display_name)),
        }
    }

    /// Renderer entry point for a template reference `{{name}}`.
    ///
    /// `name` of the form `word:parameter` (or just `word`) is expanded by the
    /// dispatcher when `word` is a magic word, without touching cache or
    /// store. Anything else is retrieved as a page: of `namespace` for a bare
    /// name, of the main namespace after a leading `:`, and of the named
    /// namespace when `name` carries a known prefix.
    pub fn transclude(
        &mut self,
        namespace: &str,
        name: &str,
        template_parameters: &TemplateParameters,
    ) -> Result<Option<String>, QuireError> {
        let (word, parameter) = name
            .split_once(NAMESPACE_SEPARATOR)
            .unwrap_or((name, ""));
        if self.is_magic_word(word) {
            return self.expand(word, parameter).map(Some);
        }

        let key = match template_key(namespace, name, &*self) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(namespace, name, error = %e, "rejected template reference");
                return Ok(None);
            }
        };
        let follow = self.follow_redirects;
        Ok(self.retrieve_page(key.namespace(), key.title(), template_parameters, follow))
    }

    // =========================================================================
    // SESSION STATE
    // =========================================================================

    /// Read totals accumulated so far.
    #[must_use]
    pub fn stats(&self) -> ReadStats {
        self.stats.stats()
    }

    /// Storage keys involved so far.
    #[must_use]
    pub fn involved_keys(&self) -> &BTreeSet<StorageKey> {
        self.stats.involved_keys()
    }

    /// The session's accumulator.
    #[must_use]
    pub fn accumulator(&self) -> &StatsAccumulator {
        &self.stats
    }

    /// The session's page cache.
    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Detach the statistics gathered so far; the session starts counting
    /// from zero while keeping its cache.
    pub fn take_stats(&mut self) -> StatsAccumulator {
        std::mem::take(&mut self.stats)
    }

    /// End the session, handing the accumulated statistics to the caller.
    #[must_use]
    pub fn into_accumulator(self) -> StatsAccumulator {
        self.stats
    }
}

impl PageSource for PageResolver<'_> {
    fn is_magic_word(&self, name: &str) -> bool {
        self.dispatcher.is_magic_word(name)
    }

    fn expand(&mut self, name: &str, parameters: &str) -> Result<String, QuireError> {
        let dispatcher = Arc::clone(&self.dispatcher);
        dispatcher.expand(name, parameters, self)
    }

    fn retrieve_page(
        &mut self,
        namespace: &str,
        title: &str,
        template_parameters: &TemplateParameters,
        follow_redirect: bool,
    ) -> Option<String> {
        self.resolve(namespace, title, template_parameters, follow_redirect)
            .into_text()
    }

    fn normalize(&self, namespace: &str, title: &str) -> Result<NormalizedTitle, QuireError> {
        self.normalizer.normalize(namespace, title)
    }
}

// =============================================================================
// TESTS
// =============================================================================
