//! Tests for link shortening.

use async_trait::async_trait;
use clonebox::{
    Clonebox, CloneboxConfig, CloneboxErrorKind, Identifier, IdentifierResolver, InMemoryRegistry,
    InMemoryStorage, Insertion, LinkRecord, LinkRegistry, LinkShortener, Sha256Resolver,
};
use clonebox_error::{CloneboxResult, ContentErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn shortener(registry: Arc<InMemoryRegistry>) -> LinkShortener {
    LinkShortener::new(registry, Arc::new(Sha256Resolver::default()))
}

/// Every link derives the same first candidate, forcing collisions.
struct CollidingResolver {
    inner: Sha256Resolver,
}

impl IdentifierResolver for CollidingResolver {
    fn derive_candidate(&self, _content: &[u8]) -> Identifier {
        Identifier::new("aaaaaa")
    }

    fn next_candidate(&self, previous: &Identifier, content: &[u8]) -> Identifier {
        self.inner.next_candidate(previous, content)
    }
}

/// Never leaves the first candidate.
struct StuckResolver;

impl IdentifierResolver for StuckResolver {
    fn derive_candidate(&self, _content: &[u8]) -> Identifier {
        Identifier::new("aaaaaa")
    }

    fn next_candidate(&self, previous: &Identifier, _content: &[u8]) -> Identifier {
        previous.clone()
    }
}

/// Answers the first content lookup as if nothing were registered.
struct StaleLookupRegistry {
    inner: InMemoryRegistry,
    lookups: AtomicUsize,
}

#[async_trait]
impl LinkRegistry for StaleLookupRegistry {
    async fn find_by_content(&self, content: &str) -> CloneboxResult<Option<LinkRecord>> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_by_content(content).await
    }

    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> CloneboxResult<Option<LinkRecord>> {
        self.inner.find_by_identifier(identifier).await
    }

    async fn insert_link(
        &self,
        identifier: &Identifier,
        content: &str,
    ) -> CloneboxResult<Insertion<LinkRecord>> {
        self.inner.insert_link(identifier, content).await
    }

    async fn latest_links(&self, limit: usize) -> CloneboxResult<Vec<LinkRecord>> {
        self.inner.latest_links(limit).await
    }
}

#[tokio::test]
async fn shortening_is_idempotent() {
    let registry = Arc::new(InMemoryRegistry::new());
    let links = shortener(registry.clone());

    let first = links.shorten_link("https://example.com").await.unwrap();
    assert_eq!(first.identifier().as_str(), "100680");
    assert!(!first.was_existing);

    let second = links.shorten_link("https://example.com").await.unwrap();
    assert_eq!(second.identifier(), first.identifier());
    assert!(second.was_existing);
    assert_eq!(registry.link_count(), 1);
}

#[tokio::test]
async fn trailing_slash_is_a_different_link() {
    let links = shortener(Arc::new(InMemoryRegistry::new()));

    let bare = links.shorten_link("https://example.com").await.unwrap();
    let slashed = links.shorten_link("https://example.com/").await.unwrap();

    assert_eq!(slashed.identifier().as_str(), "0f115d");
    assert_ne!(slashed.identifier(), bare.identifier());
    assert!(!slashed.was_existing);
}

#[tokio::test]
async fn missing_scheme_defaults_to_https() {
    let links = shortener(Arc::new(InMemoryRegistry::new()));

    let explicit = links.shorten_link("https://example.com").await.unwrap();
    let bare = links.shorten_link("  example.com ").await.unwrap();

    assert_eq!(bare.identifier(), explicit.identifier());
    assert!(bare.was_existing);
}

#[tokio::test]
async fn invalid_links_are_rejected_without_registering() {
    let registry = Arc::new(InMemoryRegistry::new());
    let links = shortener(registry.clone());

    for input in ["", "   ", "https://", "not a url at all"] {
        let err = links.shorten_link(input).await.unwrap_err();
        assert!(err.is_invalid_content(), "{:?} should be invalid: {}", input, err);
    }
    assert_eq!(registry.link_count(), 0);
}

#[tokio::test]
async fn colliding_candidates_walk_the_chain() {
    let registry = Arc::new(InMemoryRegistry::new());
    let resolver = Arc::new(CollidingResolver {
        inner: Sha256Resolver::default(),
    });
    let links = LinkShortener::new(registry.clone(), resolver.clone());

    let a = links.shorten_link("https://a.example").await.unwrap();
    let b = links.shorten_link("https://b.example").await.unwrap();

    assert_eq!(a.identifier().as_str(), "aaaaaa");
    let expected = resolver
        .inner
        .next_candidate(&Identifier::new("aaaaaa"), b"https://b.example");
    assert_eq!(b.identifier(), &expected);
    assert!(!b.was_existing);

    // Both still resolve to their own link.
    let resolved_a = links.resolve_link("aaaaaa").await.unwrap().unwrap();
    let resolved_b = links
        .resolve_link(b.identifier().as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved_a.content, "https://a.example");
    assert_eq!(resolved_b.content, "https://b.example");

    // And re-shortening the collided link is still idempotent.
    let again = links.shorten_link("https://b.example").await.unwrap();
    assert_eq!(again.identifier(), b.identifier());
    assert!(again.was_existing);
}

#[tokio::test]
async fn exhausted_candidates_report_retries_exhausted() {
    let registry = Arc::new(InMemoryRegistry::new());
    let links = LinkShortener::new(registry.clone(), Arc::new(StuckResolver)).with_max_attempts(3);

    links.shorten_link("https://a.example").await.unwrap();
    let err = links.shorten_link("https://b.example").await.unwrap_err();

    match err.kind() {
        CloneboxErrorKind::Content(e) => {
            assert_eq!(e.kind, ContentErrorKind::RetriesExhausted(3))
        }
        other => panic!("Expected content error, got {:?}", other),
    }
    assert_eq!(registry.link_count(), 1);
}

#[tokio::test]
async fn content_conflict_after_stale_lookup_returns_winner() {
    let inner = InMemoryRegistry::new();
    let winner = inner
        .insert_link(&Identifier::new("100680"), "https://example.com")
        .await
        .unwrap()
        .registered()
        .unwrap();

    let registry = Arc::new(StaleLookupRegistry {
        inner: inner.clone(),
        lookups: AtomicUsize::new(0),
    });
    let links = LinkShortener::new(registry, Arc::new(Sha256Resolver::default()));

    let outcome = links.shorten_link("https://example.com").await.unwrap();
    assert!(outcome.was_existing);
    assert_eq!(outcome.record, winner);
    assert_eq!(inner.link_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_shortening_registers_once() {
    let registry = Arc::new(InMemoryRegistry::new());
    let links = shortener(registry.clone());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let links = links.clone();
        tasks.push(tokio::spawn(async move {
            links.shorten_link("https://race.example").await.unwrap()
        }));
    }

    let mut fresh = 0;
    let mut identifiers = Vec::new();
    for task in tasks {
        let outcome = task.await.unwrap();
        if !outcome.was_existing {
            fresh += 1;
        }
        identifiers.push(outcome.identifier().clone());
    }

    assert_eq!(fresh, 1);
    assert!(identifiers.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(registry.link_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_colliding_links_get_distinct_identifiers() {
    let registry = Arc::new(InMemoryRegistry::new());
    let links = LinkShortener::new(
        registry.clone(),
        Arc::new(CollidingResolver {
            inner: Sha256Resolver::default(),
        }),
    );

    let mut tasks = Vec::new();
    for i in 0..8 {
        let links = links.clone();
        tasks.push(tokio::spawn(async move {
            links
                .shorten_link(&format!("https://collide.example/{}", i))
                .await
                .unwrap()
        }));
    }

    let mut identifiers = Vec::new();
    for task in tasks {
        identifiers.push(task.await.unwrap().identifier().clone());
    }
    identifiers.sort();
    identifiers.dedup();
    assert_eq!(identifiers.len(), 8);
    assert_eq!(registry.link_count(), 8);
}

#[tokio::test]
async fn resolve_link_is_case_insensitive_and_ignores_garbage() {
    let links = shortener(Arc::new(InMemoryRegistry::new()));
    links.shorten_link("https://example.com").await.unwrap();

    let found = links.resolve_link("100680").await.unwrap().unwrap();
    assert_eq!(found.content, "https://example.com");
    assert!(links.resolve_link(" 100680 ").await.unwrap().is_some());
    assert!(links.resolve_link("ffffff").await.unwrap().is_none());
    assert!(links.resolve_link("../etc").await.unwrap().is_none());
    assert!(links.resolve_link("").await.unwrap().is_none());
}

#[tokio::test]
async fn latest_links_uses_registration_order() {
    let app = Clonebox::from_parts(
        CloneboxConfig::default(),
        Arc::new(InMemoryRegistry::new()),
        Arc::new(InMemoryRegistry::new()),
        Arc::new(InMemoryStorage::new()),
    )
    .unwrap();

    for i in 0..6 {
        app.links()
            .shorten_link(&format!("https://example.com/{}", i))
            .await
            .unwrap();
    }

    let limit = app.config().links.latest_limit;
    let latest = app.links().latest_links(limit).await.unwrap();
    assert_eq!(latest.len(), 5);
    assert_eq!(latest[0].content, "https://example.com/5");
    assert_eq!(latest[4].content, "https://example.com/1");
}
