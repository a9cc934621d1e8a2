//! Integration tests for lazy publication resolution
//!
//! A `CountingStore` wraps the in-memory store, records every lookup and can
//! delay individual references to simulate slow relays.

use std::collections::HashMap;
use std::sync::{Mutex, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use publication_tree::asciidoc::Document;
use publication_tree::{
    reconstruct, retrieve_section, BackingStore, DecomposeOptions, Decomposer, Error, Event,
    EventAddress, EventRef, MemoryStore, NoteId, PublicationTree, Pubkey, ResolverConfig,
    TreeResolver,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests (only runs once even if called multiple times)
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("publication_tree=debug".parse().unwrap()),
            )
            .with_test_writer()
            .init();
    });
}

#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<EventRef>>,
    delays: HashMap<EventRef, Duration>,
}

impl CountingStore {
    fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            inner: events.into_iter().collect(),
            ..Default::default()
        }
    }

    fn delay(mut self, reference: EventRef, delay: Duration) -> Self {
        self.delays.insert(reference, delay);
        self
    }

    fn calls(&self) -> Vec<EventRef> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, reference: EventRef) {
        let delay = self.delays.get(&reference).copied();
        self.calls.lock().unwrap().push(reference);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl BackingStore for CountingStore {
    async fn fetch_by_id(&self, id: &NoteId) -> Option<Event> {
        self.record(EventRef::Id(*id)).await;
        self.inner.fetch_by_id(id).await
    }

    async fn fetch_by_address(&self, address: &EventAddress) -> Option<Event> {
        self.record(EventRef::Address(address.clone())).await;
        self.inner.fetch_by_address(address).await
    }
}

fn pk() -> Pubkey {
    Pubkey::new([0xaa; 32])
}

fn tag(name: &str, value: &str) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

fn leaf(dtag: &str, title: &str, content: &str) -> Event {
    Event::unsigned(
        pk(),
        1,
        30041,
        vec![tag("d", dtag), tag("title", title)],
        content.to_string(),
    )
}

fn index(dtag: &str, title: &str, extra: Vec<Vec<String>>) -> Event {
    let mut tags = vec![tag("d", dtag), tag("title", title)];
    tags.extend(extra);
    Event::unsigned(pk(), 1, 30040, tags, String::new())
}

fn a_tag(ev: &Event) -> Vec<String> {
    tag("a", &ev.address().unwrap().to_string())
}

fn address_ref(ev: &Event) -> EventRef {
    EventRef::Address(ev.address().unwrap())
}

/// ```text
/// book
/// ├── ch1
/// │   ├── s1
/// │   └── s2
/// └── ch2
///     ├── s3
///     ├── (a-tag back to book)
///     └── note (e-tag, kind 1)
/// ```
struct Fixture {
    book: Event,
    ch1: Event,
    ch2: Event,
    s1: Event,
    s2: Event,
    s3: Event,
    note: Event,
}

impl Fixture {
    fn new() -> Self {
        let s1 = leaf("s1", "Section 1", "Text");
        let s2 = leaf("s2", "Section 2", "More");
        let s3 = leaf("s3", "Section 3", "Last");
        let note = Event::unsigned(pk(), 1, 1, vec![], "a plain note".to_string());

        let ch1 = index("ch1", "Chapter 1", vec![a_tag(&s1), a_tag(&s2)]);
        let book_addr = EventAddress::new(30040, pk(), "book").to_string();
        let ch2 = index(
            "ch2",
            "Chapter 2",
            vec![a_tag(&s3), tag("a", &book_addr), tag("e", &note.id.hex())],
        );
        let book = index("book", "Book", vec![a_tag(&ch1), a_tag(&ch2)]);

        Self {
            book,
            ch1,
            ch2,
            s1,
            s2,
            s3,
            note,
        }
    }

    fn events(&self) -> Vec<Event> {
        vec![
            self.book.clone(),
            self.ch1.clone(),
            self.ch2.clone(),
            self.s1.clone(),
            self.s2.clone(),
            self.s3.clone(),
            self.note.clone(),
        ]
    }

    fn tree(&self) -> PublicationTree {
        PublicationTree::new(self.book.clone())
    }
}

#[tokio::test]
async fn present_target_needs_no_fetch() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let (found, stats) = resolver
        .resolve_with_stats(&mut tree, &address_ref(&fx.book))
        .await
        .unwrap();

    assert_eq!(found, Some(PublicationTree::ROOT));
    assert_eq!(stats.rounds, 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn resolution_stops_as_soon_as_target_appears() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let (found, stats) = resolver
        .resolve_with_stats(&mut tree, &address_ref(&fx.s1))
        .await
        .unwrap();

    let found = found.expect("s1 should resolve");
    assert_eq!(tree.node(found).unwrap().id(), &fx.s1.id);
    assert_eq!(stats.rounds, 2);
    assert_eq!(
        store.calls(),
        vec![
            address_ref(&fx.ch1),
            address_ref(&fx.ch2),
            address_ref(&fx.s1),
            address_ref(&fx.s2),
        ]
    );

    // ch2 was fetched but never expanded
    assert!(tree.children(&address_ref(&fx.ch2)).is_empty());
    assert_eq!(tree.depth(found), 2);
}

#[tokio::test]
async fn unreachable_target_visits_each_node_once() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let missing = EventRef::Id(NoteId::new([0x42; 32]));
    let (found, stats) = resolver
        .resolve_with_stats(&mut tree, &missing)
        .await
        .unwrap();

    assert_eq!(found, None);
    assert_eq!(tree.node_count(), 7);
    assert_eq!(stats.visited, tree.node_count());
    assert_eq!(stats.inserted, 6);

    let calls = store.calls();
    assert_eq!(calls.len(), 6);
    for (i, call) in calls.iter().enumerate() {
        assert!(!calls[i + 1..].contains(call), "{call} fetched twice");
    }

    // the back-reference to the root was dropped, the e-tag resolved by id
    let ch2_children: Vec<&NoteId> = tree
        .children(&address_ref(&fx.ch2))
        .into_iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(ch2_children, vec![&fx.s3.id, &fx.note.id]);
    assert!(tree.get(&EventRef::Id(fx.note.id)).unwrap().address.is_none());
}

#[tokio::test]
async fn child_order_follows_references_not_completion() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events())
        .delay(address_ref(&fx.s1), Duration::from_millis(30));
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    resolver
        .resolve(&mut tree, &address_ref(&fx.s2))
        .await
        .unwrap()
        .expect("s2 should resolve");

    let titles: Vec<&str> = tree
        .children(&address_ref(&fx.ch1))
        .into_iter()
        .map(|n| n.title())
        .collect();
    assert_eq!(titles, vec!["Section 1", "Section 2"]);
}

#[tokio::test]
async fn timed_out_fetch_is_treated_as_missing() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events())
        .delay(address_ref(&fx.s1), Duration::from_secs(10));
    let config = ResolverConfig {
        fetch_timeout_ms: 50,
        ..Default::default()
    };
    let resolver = TreeResolver::new(&store, config);
    let mut tree = fx.tree();

    let found = resolver
        .resolve(&mut tree, &address_ref(&fx.s2))
        .await
        .unwrap();

    assert!(found.is_some());
    assert!(!tree.contains(&address_ref(&fx.s1)));
    assert_eq!(tree.children(&address_ref(&fx.ch1)).len(), 1);
}

#[tokio::test]
async fn missing_events_do_not_abort_the_round() {
    init_tracing();
    let fx = Fixture::new();
    // s1 never made it to the store
    let events = fx.events().into_iter().filter(|e| e.id != fx.s1.id);
    let store = CountingStore::new(events);
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let found = resolver
        .resolve(&mut tree, &address_ref(&fx.s3))
        .await
        .unwrap();

    assert!(found.is_some());
    assert!(tree.contains(&address_ref(&fx.s2)));
    assert!(!tree.contains(&address_ref(&fx.s1)));
}

#[tokio::test]
async fn retrieve_section_renders_the_parent() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let rendered = retrieve_section(
        &resolver,
        &mut tree,
        &address_ref(&fx.s1),
        &|text: &str| format!("<pre>{text}</pre>"),
    )
    .await
    .unwrap();

    assert_eq!(
        rendered,
        "<pre>== Chapter 1\n\n=== Section 1\n\nText\n\n=== Section 2\n\nMore</pre>"
    );
}

#[tokio::test]
async fn retrieve_section_of_root_renders_whole_publication() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let text = retrieve_section(
        &resolver,
        &mut tree,
        &EventRef::Id(fx.book.id),
        &|text: &str| text.to_string(),
    )
    .await
    .unwrap();

    assert_eq!(
        text,
        "= Book\n\n\
         == Chapter 1\n\n=== Section 1\n\nText\n\n=== Section 2\n\nMore\n\n\
         == Chapter 2\n\n=== Section 3\n\nLast\n\na plain note"
    );
}

#[tokio::test]
async fn later_resolve_descends_into_earlier_results() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let s1 = resolver
        .resolve(&mut tree, &address_ref(&fx.s1))
        .await
        .unwrap();
    assert!(s1.is_some());
    assert_eq!(store.calls().len(), 4);

    // ch2 is already loaded, only its children are missing
    let s3 = resolver
        .resolve(&mut tree, &address_ref(&fx.s3))
        .await
        .unwrap();
    let s3 = s3.expect("s3 is reachable through ch2");
    assert_eq!(tree.node(s3).unwrap().id(), &fx.s3.id);
    assert_eq!(
        store.calls()[4..].to_vec(),
        vec![address_ref(&fx.s3), EventRef::Id(fx.note.id)]
    );
}

#[tokio::test]
async fn retrieve_section_twice_on_one_tree() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();
    let plain = |text: &str| text.to_string();

    let first = retrieve_section(&resolver, &mut tree, &address_ref(&fx.s1), &plain)
        .await
        .unwrap();
    assert_eq!(first, "== Chapter 1\n\n=== Section 1\n\nText\n\n=== Section 2\n\nMore");

    let second = retrieve_section(&resolver, &mut tree, &address_ref(&fx.s3), &plain)
        .await
        .unwrap();
    assert_eq!(second, "== Chapter 2\n\n=== Section 3\n\nLast\n\na plain note");
}

#[tokio::test]
async fn retrieve_section_reports_unresolvable_target() {
    init_tracing();
    let fx = Fixture::new();
    let store = CountingStore::new(fx.events());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = fx.tree();

    let missing = EventRef::Address(EventAddress::new(30041, pk(), "nowhere"));
    let err = retrieve_section(&resolver, &mut tree, &missing, &|t: &str| t.len())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TargetNotFound(_)));
    // the search still grew the tree
    assert_eq!(tree.node_count(), 7);
}

const BOOK: &str = "\
= Field Guide

Welcome.

== Birds

[[robin]]
.Robin
The robin sings.

=== Water Birds

Ducks paddle.

== Trees

Oaks are tall.
";

#[tokio::test]
async fn decomposed_publication_resolves_lazily() {
    init_tracing();
    let options = DecomposeOptions::new(pk(), 1_700_000_000);
    let full = Decomposer::new(options)
        .decompose(&Document::parse(BOOK))
        .unwrap();

    let store = CountingStore::new(full.events().cloned());
    let resolver = TreeResolver::new(&store, ResolverConfig::default());
    let mut tree = PublicationTree::new(full.root().event.clone());

    let duck = EventRef::Address(EventAddress::new(
        30041,
        pk(),
        "field-guide-paragraph-2",
    ));
    let water_birds = EventRef::Address(EventAddress::new(30040, pk(), "water-birds"));

    let rendered = retrieve_section(&resolver, &mut tree, &duck, &|t: &str| t.to_string())
        .await
        .unwrap();

    assert_eq!(rendered, "=== Water Birds\n\nDucks paddle.");
    assert_eq!(rendered, reconstruct(&full, &water_birds).unwrap());

    let birds = EventRef::Address(EventAddress::new(30040, pk(), "birds"));
    assert_eq!(
        reconstruct(&tree, &birds).unwrap(),
        "== Birds\n\n[[robin]]\n.Robin\nThe robin sings.\n\n=== Water Birds\n\nDucks paddle."
    );
}

#[test]
fn republishing_is_stable() {
    let options = DecomposeOptions::new(pk(), 1_700_000_000);
    let first = Decomposer::new(options.clone())
        .decompose(&Document::parse(BOOK))
        .unwrap();
    let second = Decomposer::new(options)
        .decompose(&Document::parse(BOOK))
        .unwrap();

    let addresses = |tree: &PublicationTree| -> Vec<String> {
        tree.iter()
            .filter_map(|(_, n)| n.address.as_ref().map(ToString::to_string))
            .collect()
    };

    assert_eq!(addresses(&first), addresses(&second));
    assert!(addresses(&first).iter().any(|a| a.ends_with(":robin")));
}

const CAPTIONED_LISTING: &str = "\
= Doc

== Part

[[keep-me]]
.Caption
----
code
----
";

#[test]
fn reconstructed_text_decomposes_to_the_same_events() {
    let options = DecomposeOptions::new(pk(), 1_700_000_000);
    let decomposer = Decomposer::new(options);

    for source in [BOOK, CAPTIONED_LISTING] {
        let first = decomposer.decompose(&Document::parse(source)).unwrap();
        let root = EventRef::Id(first.root().event.id);
        let text = reconstruct(&first, &root).unwrap();
        let second = decomposer.decompose(&Document::parse(&text)).unwrap();

        let first_events: Vec<&Event> = first.events().collect();
        let second_events: Vec<&Event> = second.events().collect();
        assert_eq!(first_events, second_events, "text was:\n{text}");
    }
}
