//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, page resolution is INVALID.
//!
//! ## Tiers
//! - T0: Reference Integrity
//! - T1: Session Caching
//! - T2: Single-Hop Redirects
//! - T3: Statistics and Provenance
//! - T4: Magic Word Routing

#![allow(clippy::unwrap_used, clippy::panic)]

use quire_core::{
    FetchError, MemoryRevisionStore, NormalizedTitle, PageResolver, PageSource, QuireError,
    Resolution, ResolverConfig, Revision, RevisionStore, StorageKey, TemplateParameters,
};

fn key(ns: &str, title: &str) -> NormalizedTitle {
    NormalizedTitle::from_canonical(ns, title)
}

fn store(pages: &[(&str, &str, Revision)]) -> MemoryRevisionStore {
    let mut store = MemoryRevisionStore::new();
    for (ns, title, revision) in pages {
        store.insert(key(ns, title), revision.clone());
    }
    store
}

fn resolver<'s>(store: &'s dyn RevisionStore) -> PageResolver<'s> {
    PageResolver::new(&ResolverConfig::default(), Some(store)).expect("resolver")
}

fn no_params() -> TemplateParameters {
    TemplateParameters::new()
}

// =============================================================================
// TIER T0: REFERENCE INTEGRITY
// =============================================================================

mod t0_reference_integrity {
    use super::*;

    /// T0.1: An empty title resolves to nothing without touching the store.
    #[test]
    fn empty_title_is_not_fetched() {
        let pages = store(&[]);
        let mut resolver = resolver(&pages);

        assert_eq!(resolver.retrieve_page("", "", &no_params(), true), None);
        assert_eq!(pages.fetch_count(), 0);
        assert!(resolver.cache().is_empty());
    }

    /// T0.2: Surface variants of one title share a single cache entry.
    #[test]
    fn surface_variants_share_one_key() {
        let pages = store(&[("Help", "Main Page", Revision::content("Welcome"))]);
        let mut resolver = resolver(&pages);

        for title in ["Main Page", "main_Page", "  Main   Page "] {
            assert_eq!(
                resolver.retrieve_page("Help", title, &no_params(), true).as_deref(),
                Some("Welcome")
            );
        }
        assert_eq!(pages.fetch_count(), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    /// T0.3: Namespace aliases resolve to the canonical namespace.
    #[test]
    fn namespace_alias_resolves_canonically() {
        let pages = store(&[("File", "Logo.png", Revision::content("image"))]);
        let mut resolver = resolver(&pages);

        assert_eq!(
            resolver.retrieve_page("Image", "Logo.png", &no_params(), true).as_deref(),
            Some("image")
        );
        assert_eq!(
            resolver.retrieve_page("", "File:Logo.png", &no_params(), true).as_deref(),
            Some("image")
        );
        assert_eq!(pages.fetch_count(), 1);
    }
}

// =============================================================================
// TIER T1: SESSION CACHING
// =============================================================================

mod t1_session_caching {
    use super::*;

    /// T1.1: Repeated requests for one page fetch it exactly once.
    #[test]
    fn idempotent_cache() {
        let pages = store(&[("", "Berlin", Revision::content("Capital"))]);
        let mut resolver = resolver(&pages);

        let first = resolver.retrieve_page("", "Berlin", &no_params(), true);
        let second = resolver.retrieve_page("", "Berlin", &no_params(), true);

        assert_eq!(first.as_deref(), Some("Capital"));
        assert_eq!(first, second);
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T1.2: A failed fetch is remembered and not retried.
    #[test]
    fn negative_caching_of_fetch_failure() {
        let mut pages = store(&[]);
        pages.fail_with(key("", "Flaky"), FetchError::Store("unreachable".to_string()));
        let mut resolver = resolver(&pages);

        assert_eq!(resolver.retrieve_page("", "Flaky", &no_params(), true), None);
        assert_eq!(resolver.retrieve_page("", "Flaky", &no_params(), true), None);
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T1.3: Confirmed absence is remembered too.
    #[test]
    fn negative_caching_of_absence() {
        let pages = store(&[]);
        let mut resolver = resolver(&pages);

        assert_eq!(resolver.resolve("", "Ghost", &no_params(), true), Resolution::NotFound);
        assert_eq!(resolver.resolve("", "Ghost", &no_params(), true), Resolution::Cached(None));
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T1.4: Without a connection nothing is cached, so a later connection
    /// can still answer.
    #[test]
    fn no_connection_is_not_cached() {
        let pages = store(&[("", "Berlin", Revision::content("Capital"))]);
        let mut resolver =
            PageResolver::new(&ResolverConfig::default(), None).expect("resolver");

        assert_eq!(resolver.resolve("", "Berlin", &no_params(), true), Resolution::NoConnection);
        assert!(resolver.cache().is_empty());

        resolver.set_connection(Some(&pages));
        assert_eq!(
            resolver.retrieve_page("", "Berlin", &no_params(), true).as_deref(),
            Some("Capital")
        );
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T1.5: Caches belong to one session.
    #[test]
    fn sessions_do_not_share_caches() {
        let pages = store(&[("", "Berlin", Revision::content("Capital"))]);

        let mut first = resolver(&pages);
        let mut second = resolver(&pages);
        let _ = first.retrieve_page("", "Berlin", &no_params(), true);
        let _ = second.retrieve_page("", "Berlin", &no_params(), true);

        assert_eq!(pages.fetch_count(), 2);
    }
}

// =============================================================================
// TIER T2: SINGLE-HOP REDIRECTS
// =============================================================================

mod t2_single_hop_redirects {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts WARN events, the operator-facing log level.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// T2.1: A redirect is followed exactly once: A -> B -> C yields B's raw
    /// redirect text, and C is never fetched.
    #[test]
    fn redirect_transclusion_is_single_hop() {
        let pages = store(&[
            ("", "A", Revision::redirect("#REDIRECT [[B]]")),
            ("", "B", Revision::redirect("#REDIRECT [[C]]")),
            ("", "C", Revision::content("end of the line")),
        ]);
        let mut resolver = resolver(&pages);

        assert_eq!(
            resolver.retrieve_page("", "A", &no_params(), true).as_deref(),
            Some("#REDIRECT [[C]]")
        );
        assert_eq!(pages.fetch_count(), 2);
        assert!(!resolver.cache().has(&key("", "C")));
    }

    /// T2.2: A redirect to a missing page yields a notice naming the target
    /// canonically.
    #[test]
    fn dangling_redirect_yields_notice() {
        let pages = store(&[("", "A", Revision::redirect("#REDIRECT [[help:missing_page]]"))]);
        let mut resolver = resolver(&pages);

        assert_eq!(
            resolver.retrieve_page("", "A", &no_params(), true).as_deref(),
            Some("<ol><li>REDIRECT [[Help:Missing page]]</li></ol>")
        );
    }

    /// T2.3: An unparseable redirect yields nothing and exactly one warning.
    #[test]
    fn malformed_redirect_is_disarmed_with_one_warning() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

        let pages = store(&[("", "A", Revision::redirect("#REDIRECT somewhere else"))]);
        let mut resolver = resolver(&pages);

        let resolution = tracing::subscriber::with_default(subscriber, || {
            resolver.resolve("", "A", &no_params(), true)
        });

        assert_eq!(resolution, Resolution::RedirectDisarmed);
        assert_eq!(resolution.into_text(), None);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T2.4: Localised redirect keywords from configuration are honoured.
    #[test]
    fn configured_redirect_keywords() {
        let config = ResolverConfig {
            redirect_keywords: vec!["REDIRECT".to_string(), "WEITERLEITUNG".to_string()],
            ..ResolverConfig::default()
        };
        let pages = store(&[
            ("", "A", Revision::redirect("#WEITERLEITUNG [[B]]")),
            ("", "B", Revision::content("Ziel")),
        ]);
        let mut resolver = PageResolver::new(&config, Some(&pages)).expect("resolver");

        assert_eq!(
            resolver.retrieve_page("", "A", &no_params(), true).as_deref(),
            Some("Ziel")
        );
    }
}

// =============================================================================
// TIER T3: STATISTICS AND PROVENANCE
// =============================================================================

mod t3_statistics {
    use super::*;
    use quire_core::{StatsAccumulator, page_key, revision_key};

    /// T3.1: Both fetches of a redirect hop land in one accumulator.
    #[test]
    fn stats_cover_both_fetches_of_a_redirect() {
        let pages = store(&[
            ("", "A", Revision::redirect("#REDIRECT [[B]]")),
            ("", "B", Revision::content("Hello")),
        ]);
        let mut resolver = resolver(&pages);
        let mut acc = StatsAccumulator::new();

        let text = resolver
            .resolve_with("", "A", &no_params(), true, &mut acc)
            .into_text();

        assert_eq!(text.as_deref(), Some("Hello"));
        assert_eq!(acc.stats().fetches, 2);
        assert_eq!(acc.stats().failed_fetches, 0);

        let keys: Vec<&StorageKey> = acc.involved_keys().iter().collect();
        assert_eq!(
            keys,
            vec![
                &page_key(&key("", "A")),
                &page_key(&key("", "B")),
                &revision_key(&key("", "A"), 1),
                &revision_key(&key("", "B"), 1),
            ]
        );
    }

    /// T3.2: Cache hits add nothing to the statistics.
    #[test]
    fn cache_hits_are_free() {
        let pages = store(&[("", "A", Revision::content("alpha"))]);
        let mut resolver = resolver(&pages);

        let _ = resolver.retrieve_page("", "A", &no_params(), true);
        let before = resolver.stats();
        let _ = resolver.retrieve_page("", "A", &no_params(), true);

        assert_eq!(resolver.stats(), before);
        assert_eq!(before.fetches, 1);
        assert_eq!(before.bytes_read, 5);
    }

    /// T3.3: Detaching the statistics resets the totals but not the cache.
    #[test]
    fn take_stats_keeps_the_cache() {
        let pages = store(&[("", "A", Revision::content("alpha"))]);
        let mut resolver = resolver(&pages);

        let _ = resolver.retrieve_page("", "A", &no_params(), true);
        let taken = resolver.take_stats();
        let _ = resolver.retrieve_page("", "A", &no_params(), true);

        assert_eq!(taken.stats().fetches, 1);
        assert_eq!(resolver.stats().fetches, 0);
        assert!(resolver.involved_keys().is_empty());
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T3.4: Failed fetches are counted and their keys recorded.
    #[test]
    fn failures_are_accounted() {
        let pages = store(&[]);
        let mut resolver = resolver(&pages);

        let _ = resolver.retrieve_page("", "Ghost", &no_params(), true);
        let acc = resolver.into_accumulator();

        assert_eq!(acc.stats().failed_fetches, 1);
        assert!(acc.involved_keys().contains(&page_key(&key("", "Ghost"))));
    }
}

// =============================================================================
// TIER T4: MAGIC WORD ROUTING
// =============================================================================

mod t4_magic_words {
    use super::*;
    use quire_core::{MagicWord, MagicWordDispatcher};
    use std::sync::Arc;

    struct Broken;

    impl MagicWord for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn expand(&self, _: &str, _: &mut dyn PageSource) -> Result<String, QuireError> {
            Err(QuireError::MagicWord {
                name: "broken".to_string(),
                reason: "always fails".to_string(),
            })
        }
    }

    /// T4.1: Magic words are never fetched and never cached.
    #[test]
    fn magic_words_bypass_store_and_cache() {
        let pages = store(&[("Template", "Lc", Revision::content("page, not magic"))]);
        let mut resolver = resolver(&pages);

        let text = resolver.transclude("Template", "lc:ABC", &no_params()).expect("expand");
        assert_eq!(text.as_deref(), Some("abc"));
        let text = resolver.transclude("Template", "lc:ABC", &no_params()).expect("expand");
        assert_eq!(text.as_deref(), Some("abc"));

        assert_eq!(pages.fetch_count(), 0);
        assert!(resolver.cache().is_empty());
    }

    /// T4.2: Expansion may read pages back through the resolver.
    #[test]
    fn raw_include_goes_through_the_cache() {
        let pages = store(&[("Template", "Greeting", Revision::content("Hi"))]);
        let mut resolver = resolver(&pages);

        assert_eq!(
            resolver.transclude("", "raw:Greeting", &no_params()).expect("raw"),
            Some("Hi".to_string())
        );
        assert_eq!(
            resolver.transclude("Template", "Greeting", &no_params()).expect("page"),
            Some("Hi".to_string())
        );
        assert_eq!(pages.fetch_count(), 1);
    }

    /// T4.3: Handler failures reach the caller unchanged.
    #[test]
    fn dispatcher_failure_propagates() {
        let pages = store(&[]);
        let mut dispatcher = MagicWordDispatcher::with_builtins();
        dispatcher.register(Broken);
        let mut resolver = resolver(&pages).with_dispatcher(Arc::new(dispatcher));

        let err = resolver
            .transclude("Template", "broken:x", &no_params())
            .expect_err("must fail");
        assert_eq!(
            err,
            QuireError::MagicWord {
                name: "broken".to_string(),
                reason: "always fails".to_string()
            }
        );
        assert!(resolver.cache().is_empty());
    }

    /// T4.4: Expanding an unknown name is an error, not a page lookup.
    #[test]
    fn unknown_magic_word_is_an_error() {
        let pages = store(&[]);
        let mut resolver = resolver(&pages);

        assert!(matches!(
            resolver.expand("nosuchword", ""),
            Err(QuireError::UnknownMagicWord(_))
        ));
        assert_eq!(pages.fetch_count(), 0);
    }
}
