//! Splitting a document into publication events
//!
//! Sections become 30040 index events referencing their children through
//! ordered `a` tags; every other block becomes a 30041 content event. The
//! document itself is the root index.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{EventAddress, EventRef};
use crate::constants::{KIND_PUBLICATION_CONTENT, KIND_PUBLICATION_INDEX};
use crate::document::DocumentSource;
use crate::dtag::{fallback_dtag, normalize_dtag, normalized_candidate, ContextCounters};
use crate::event::Event;
use crate::id::Pubkey;
use crate::node::NodeType;
use crate::tree::PublicationTree;
use crate::Result;

/// d-tag used when a document has neither an id nor a usable title
pub const UNTITLED_DOCUMENT_TAG: &str = "untitled";

/// Author, timestamp and naming settings shared by every event of one
/// decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecomposeOptions {
    /// Author of every minted event
    pub pubkey: Pubkey,

    /// Timestamp stamped on every minted event
    pub created_at: u64,

    /// Overrides the document tag derived from the document id or title
    #[serde(default)]
    pub document_tag: Option<String>,
}

impl DecomposeOptions {
    /// Options with the document tag derived from the document itself
    pub fn new(pubkey: Pubkey, created_at: u64) -> Self {
        Self {
            pubkey,
            created_at,
            document_tag: None,
        }
    }
}

/// One node decided on during the breadth-first pass
#[derive(Debug)]
struct Planned {
    dtag: String,
    title: Option<String>,
    node_type: NodeType,
    content: String,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Planned {
    fn kind(&self) -> u32 {
        match self.node_type {
            NodeType::Index => KIND_PUBLICATION_INDEX,
            NodeType::Leaf => KIND_PUBLICATION_CONTENT,
        }
    }
}

/// Splits documents into publication events for one author.
///
/// A decomposer holds no state between runs; every [`decompose`](Self::decompose)
/// starts with fresh fallback counters.
pub struct Decomposer {
    options: DecomposeOptions,
}

impl Decomposer {
    /// Create a decomposer minting events with `options`
    pub fn new(options: DecomposeOptions) -> Self {
        Self { options }
    }

    /// Split `doc` into a publication tree.
    ///
    /// The same document with the same options always yields the same
    /// addresses and event ids.
    pub fn decompose<D: DocumentSource>(&self, doc: &D) -> Result<PublicationTree> {
        let plan = self.plan(doc);

        let root = self.mint(&plan, PublicationTree::ROOT);
        let mut ids = vec![EventRef::Id(root.id)];
        let mut tree = PublicationTree::new(root);

        // parents always precede their children in the plan
        for (idx, planned) in plan.iter().enumerate().skip(1) {
            let event = self.mint(&plan, idx);
            ids.push(EventRef::Id(event.id));

            let parent = planned.parent.unwrap_or(PublicationTree::ROOT);
            tree.add_node(event, &ids[parent])?;
        }

        info!(
            "decomposed '{}' into {} nodes",
            plan[PublicationTree::ROOT].dtag,
            tree.node_count()
        );

        Ok(tree)
    }

    fn document_tag<D: DocumentSource>(&self, doc: &D) -> String {
        self.options
            .document_tag
            .as_deref()
            .map(normalize_dtag)
            .filter(|tag| !tag.is_empty())
            .or_else(|| normalized_candidate(doc.id()))
            .or_else(|| normalized_candidate(doc.title()))
            .unwrap_or_else(|| UNTITLED_DOCUMENT_TAG.to_string())
    }

    /// Breadth-first pass assigning d-tags. The visiting order decides
    /// which fallback counter value each untitled block gets.
    fn plan<D: DocumentSource>(&self, doc: &D) -> Vec<Planned> {
        let document_tag = self.document_tag(doc);
        let mut counters = ContextCounters::new();
        let mut used = HashSet::from([document_tag.clone()]);
        let mut slots: HashMap<D::Block, usize> = HashMap::new();

        let mut plan = vec![Planned {
            dtag: document_tag.clone(),
            title: doc.title().map(String::from),
            node_type: NodeType::Index,
            content: String::new(),
            parent: None,
            children: Vec::new(),
        }];

        let mut queue: VecDeque<D::Block> = doc.blocks().into();

        while let Some(block) = queue.pop_front() {
            let context = doc.context(block).to_string();
            let dtag = normalized_candidate(doc.block_id(block))
                .or_else(|| normalized_candidate(doc.block_title(block)))
                .unwrap_or_else(|| {
                    fallback_dtag(&document_tag, &context, counters.next(&context))
                });
            let dtag = disambiguate(dtag, &mut used);

            let parent = doc
                .parent(block)
                .and_then(|p| slots.get(&p).copied())
                .unwrap_or(PublicationTree::ROOT);

            let is_section = doc.is_section(block);
            let idx = plan.len();

            // a terminal block's title line stays in its source, so only
            // sections carry a `title` tag
            let (node_type, title, content) = if is_section {
                let title = doc.block_title(block).map(String::from);
                (NodeType::Index, title, String::new())
            } else {
                (NodeType::Leaf, None, doc.source(block))
            };

            plan.push(Planned {
                dtag,
                title,
                node_type,
                content,
                parent: Some(parent),
                children: Vec::new(),
            });
            plan[parent].children.push(idx);
            slots.insert(block, idx);

            if is_section {
                queue.extend(doc.children(block));
            }
        }

        debug!("planned {} nodes for '{}'", plan.len(), document_tag);

        plan
    }

    fn address(&self, planned: &Planned) -> EventAddress {
        EventAddress::new(planned.kind(), self.options.pubkey, planned.dtag.as_str())
    }

    fn mint(&self, plan: &[Planned], idx: usize) -> Event {
        let planned = &plan[idx];
        let mut tags = vec![vec!["d".to_string(), planned.dtag.clone()]];

        if let Some(title) = &planned.title {
            tags.push(vec!["title".to_string(), title.clone()]);
        }

        for &child in &planned.children {
            tags.push(vec!["a".to_string(), self.address(&plan[child]).to_string()]);
        }

        Event::unsigned(
            self.options.pubkey,
            self.options.created_at,
            planned.kind(),
            tags,
            planned.content.clone(),
        )
    }
}

/// Make `dtag` unique within one pass by appending `-2`, `-3`, ...
fn disambiguate(dtag: String, used: &mut HashSet<String>) -> String {
    if used.insert(dtag.clone()) {
        return dtag;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{dtag}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
