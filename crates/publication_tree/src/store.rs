//! Backing store seam for lazy tree resolution
//!
//! A backing store is wherever publication events live (relays, a local
//! database, a fixture). The resolver only needs point lookups by id and
//! by address; batching and relay filters are layered on top.

use std::future::Future;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::address::{AddressShape, EventAddress, EventRef};
use crate::event::Event;
use crate::id::{NoteId, Pubkey};

/// Source of publication events.
///
/// Lookups resolve to `None` when the event is missing or the lookup
/// failed; implementations never retry on their own.
pub trait BackingStore: Send + Sync {
    fn fetch_by_id(&self, id: &NoteId) -> impl Future<Output = Option<Event>> + Send;

    /// Newest event at a `kind:pubkey[:dtag]` address
    fn fetch_by_address(
        &self,
        address: &EventAddress,
    ) -> impl Future<Output = Option<Event>> + Send;

    /// Dispatch a reference to the lookup matching its shape
    fn fetch(&self, reference: &EventRef) -> impl Future<Output = Option<Event>> + Send {
        async move {
            match reference {
                EventRef::Id(id) => self.fetch_by_id(id).await,
                EventRef::Address(addr) => self.fetch_by_address(addr).await,
            }
        }
    }

    /// Fetch every reference concurrently. One result per input, in input order.
    fn fetch_batch(&self, refs: &[EventRef]) -> impl Future<Output = Vec<Option<Event>>> + Send {
        join_all(refs.iter().map(|r| self.fetch(r)))
    }
}

/// A NIP-01 relay filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<NoteId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Pubkey>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u32>>,

    #[serde(rename = "#d", default, skip_serializing_if = "Option::is_none")]
    pub d_tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = NoteId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = Pubkey>) -> Self {
        self.authors = Some(authors.into_iter().collect());
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u32>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn dtags<S: Into<String>>(mut self, dtags: impl IntoIterator<Item = S>) -> Self {
        self.d_tags = Some(dtags.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter selecting the events behind one address
    pub fn for_address(address: &EventAddress) -> Self {
        let filter = Filter::new()
            .kinds([address.kind])
            .authors([address.pubkey]);

        match &address.dtag {
            Some(dtag) => filter.dtags([dtag.as_str()]),
            None => filter,
        }
    }

    /// Build filters covering a fetch round.
    ///
    /// Bare ids share one filter; addresses are grouped by shape and
    /// `(kind, author)`, with parameterized d-tags folded into a single
    /// `#d` list per group. Groups keep first-seen order.
    pub fn for_refs(refs: &[EventRef]) -> Vec<Filter> {
        let mut ids: Vec<NoteId> = Vec::new();
        let mut grouped: Vec<((u32, Pubkey, AddressShape), Vec<String>)> = Vec::new();

        for reference in refs {
            let addr = match reference {
                EventRef::Id(id) => {
                    ids.push(*id);
                    continue;
                }
                EventRef::Address(addr) => addr,
            };

            let key = (addr.kind, addr.pubkey, addr.shape());
            let pos = match grouped.iter().position(|(k, _)| *k == key) {
                Some(pos) => pos,
                None => {
                    grouped.push((key, Vec::new()));
                    grouped.len() - 1
                }
            };

            if let Some(dtag) = &addr.dtag {
                grouped[pos].1.push(dtag.clone());
            }
        }

        let mut filters = Vec::new();
        if !ids.is_empty() {
            filters.push(Filter::new().ids(ids));
        }

        for ((kind, pubkey, shape), dtags) in grouped {
            let filter = Filter::new().kinds([kind]).authors([pubkey]);
            filters.push(match shape {
                AddressShape::Parameterized => filter.dtags(dtags),
                _ => filter,
            });
        }

        filters
    }

    /// Whether `event` passes every constraint in this filter
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&event.id) {
                return false;
            }
        }

        if let Some(authors) = &self.authors {
            if !authors.contains(&event.pubkey) {
                return false;
            }
        }

        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }

        if let Some(d_tags) = &self.d_tags {
            let dtag = event.dtag().unwrap_or_default();
            if !d_tags.iter().any(|d| d == dtag) {
                return false;
            }
        }

        true
    }
}

/// In-memory backing store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Vec<Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `event`; an id that is already stored is ignored
    pub fn insert(&mut self, event: Event) {
        if self.events.iter().any(|e| e.id == event.id) {
            return;
        }
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events matching `filter`, in insertion order
    pub fn query(&self, filter: &Filter) -> Vec<&Event> {
        let matched = self.events.iter().filter(|e| filter.matches(e));
        match filter.limit {
            Some(limit) => matched.take(limit as usize).collect(),
            None => matched.collect(),
        }
    }
}

impl Extend<Event> for MemoryStore {
    fn extend<T: IntoIterator<Item = Event>>(&mut self, iter: T) {
        for event in iter {
            self.insert(event);
        }
    }
}

impl FromIterator<Event> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let mut store = MemoryStore::new();
        store.extend(iter);
        store
    }
}

impl BackingStore for MemoryStore {
    async fn fetch_by_id(&self, id: &NoteId) -> Option<Event> {
        let found = self.query(&Filter::new().ids([*id])).first().cloned().cloned();
        trace!("memory store lookup {} hit={}", id, found.is_some());
        found
    }

    async fn fetch_by_address(&self, address: &EventAddress) -> Option<Event> {
        // newest wins, ties go to the lowest id
        self.query(&Filter::for_address(address))
            .into_iter()
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .cloned()
    }
}
