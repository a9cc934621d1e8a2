//! Lazy resolution of publication trees
//!
//! Starting from the root, the resolver walks the tree depth-first with an
//! explicit stack. Each visited node's `a`/`e` references that aren't in the
//! tree yet are fetched as one joined round, inserted as children in
//! reference order, and the target is re-checked before going deeper.

use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::EventRef;
use crate::event::Event;
use crate::store::BackingStore;
use crate::tree::PublicationTree;
use crate::{Error, Result};

/// Resolver settings. Missing JSON fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Per-reference fetch timeout. A timed out fetch counts as not found.
    pub fetch_timeout_ms: u64,

    /// Abort the whole resolution on a malformed reference instead of
    /// skipping it.
    pub strict_references: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 5_000,
            strict_references: false,
        }
    }
}

impl ResolverConfig {
    /// Load a config from JSON, e.g. `{"fetch_timeout_ms": 2000}`
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(Into::into)
    }

    /// Per-reference fetch timeout as a [`Duration`]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Counters for one resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Nodes popped off the work stack
    pub visited: usize,
    /// Fetch rounds issued
    pub rounds: usize,
    /// References requested across all rounds
    pub fetched: usize,
    /// Nodes added to the tree
    pub inserted: usize,
}

/// Lazily grows a [`PublicationTree`] from a [`BackingStore`].
///
/// The resolver holds no tree state of its own, so one resolver can serve
/// any number of trees, and a tree can be handed to it again after an
/// earlier call grew it.
pub struct TreeResolver<'s, S> {
    store: &'s S,
    config: ResolverConfig,
}

impl<'s, S: BackingStore> TreeResolver<'s, S> {
    pub fn new(store: &'s S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Configuration this resolver was built with
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Grow `tree` from the backing store until `target` is in it.
    ///
    /// Returns the target's node index, or `None` once every reachable node
    /// has been visited. Nodes fetched along the way stay in the tree either
    /// way.
    pub async fn resolve(
        &self,
        tree: &mut PublicationTree,
        target: &EventRef,
    ) -> Result<Option<usize>> {
        self.resolve_with_stats(tree, target)
            .await
            .map(|(found, _)| found)
    }

    /// [`resolve`](Self::resolve), also reporting what the search cost
    pub async fn resolve_with_stats(
        &self,
        tree: &mut PublicationTree,
        target: &EventRef,
    ) -> Result<(Option<usize>, ResolveStats)> {
        if let Some(idx) = tree.index_of(target) {
            debug!("{} already in tree at {}", target, idx);
            return Ok((Some(idx), ResolveStats::default()));
        }

        let (found, stats) = self.walk(tree, PublicationTree::ROOT, Some(target)).await?;

        match found {
            Some(_) => info!(
                "resolved {} after {} rounds ({} nodes visited)",
                target, stats.rounds, stats.visited
            ),
            None => info!(
                "{} not reachable: {} nodes visited in {} rounds",
                target, stats.visited, stats.rounds
            ),
        }

        Ok((found, stats))
    }

    /// Fetch everything reachable below the node at `index`.
    ///
    /// Already loaded nodes are walked through without refetching, so
    /// expanding a fully loaded subtree costs no fetch rounds.
    pub async fn expand(&self, tree: &mut PublicationTree, index: usize) -> Result<ResolveStats> {
        let (_, stats) = self.walk(tree, index, None).await?;
        debug!(
            "expanded node {}: {} nodes visited, {} inserted",
            index, stats.visited, stats.inserted
        );
        Ok(stats)
    }

    /// Depth-first walk from `start` with an explicit stack, fetching the
    /// missing references of every visited node. Stops as soon as `target`
    /// shows up in the tree.
    async fn walk(
        &self,
        tree: &mut PublicationTree,
        start: usize,
        target: Option<&EventRef>,
    ) -> Result<(Option<usize>, ResolveStats)> {
        let mut stats = ResolveStats::default();
        let mut stack = vec![start];

        while let Some(idx) = stack.pop() {
            stats.visited += 1;

            let refs = self.pending_refs(tree, idx)?;
            if !refs.is_empty() {
                stats.rounds += 1;
                stats.fetched += refs.len();
                debug!("fetch round {} for node {}: {} refs", stats.rounds, idx, refs.len());

                let fetched = self.fetch_round(&refs).await;
                let inserted = insert_fetched(tree, idx, &refs, fetched)?;
                stats.inserted += inserted.len();

                if let Some(found) = target.and_then(|t| tree.index_of(t)) {
                    return Ok((Some(found), stats));
                }
            }

            // all children, including ones loaded by an earlier call.
            // reversed so the leftmost child is popped first
            if let Some(node) = tree.node(idx) {
                stack.extend(node.children.iter().rev());
            }
        }

        Ok((None, stats))
    }

    /// References declared by the node at `idx` that the tree doesn't hold yet
    fn pending_refs(&self, tree: &PublicationTree, idx: usize) -> Result<Vec<EventRef>> {
        let Some(node) = tree.node(idx) else {
            return Ok(Vec::new());
        };

        let mut pending: Vec<EventRef> = Vec::new();

        for reference in node.event.references() {
            let reference = match reference {
                Ok(reference) => reference,
                Err(e) if self.config.strict_references => return Err(e.into()),
                Err(e) => {
                    warn!("skipping malformed reference in {}: {}", node.id(), e);
                    continue;
                }
            };

            if tree.contains(&reference) || pending.contains(&reference) {
                continue;
            }

            pending.push(reference);
        }

        Ok(pending)
    }

    async fn fetch_round(&self, refs: &[EventRef]) -> Vec<Option<Event>> {
        let timeout = self.config.fetch_timeout();

        join_all(refs.iter().map(|reference| async move {
            match tokio::time::timeout(timeout, self.store.fetch(reference)).await {
                Ok(found) => found,
                Err(_) => {
                    warn!("fetch of {} timed out after {:?}", reference, timeout);
                    None
                }
            }
        }))
        .await
    }
}

/// Insert a round's results under `parent`, keeping reference order.
/// Returns the new node indices.
fn insert_fetched(
    tree: &mut PublicationTree,
    parent: usize,
    refs: &[EventRef],
    fetched: Vec<Option<Event>>,
) -> Result<Vec<usize>> {
    let Some(parent_id) = tree.node(parent).map(|n| EventRef::Id(*n.id())) else {
        return Ok(Vec::new());
    };

    let mut inserted = Vec::new();

    for (reference, event) in refs.iter().zip(fetched) {
        let Some(event) = event else {
            debug!("{} not found", reference);
            continue;
        };

        if !event.matches_ref(reference) {
            warn!("store returned {} for {}, ignoring", event.id, reference);
            continue;
        }

        match tree.add_node(event, &parent_id) {
            Ok(idx) => inserted.push(idx),
            // an `a` and an `e` tag pointing at the same event
            Err(Error::DuplicateNode(key)) => debug!("{} already in tree", key),
            Err(e) => return Err(e),
        }
    }

    Ok(inserted)
}
