//! Publication Tree data structure
//!
//! An arena of nodes indexed two ways: by immutable event id and by
//! replaceable address. The tree only grows; nodes are appended under a
//! parent that must already be present.

use std::collections::HashMap;

use tracing::trace;

use crate::address::{EventAddress, EventRef};
use crate::event::Event;
use crate::id::NoteId;
use crate::node::PublicationTreeNode;
use crate::{Error, Result};

/// A tree structure representing a NKBIP-01 publication
#[derive(Debug, Clone)]
pub struct PublicationTree {
    /// All nodes in the tree (index-based for efficient access)
    nodes: Vec<PublicationTreeNode>,

    /// Map from event id to node index
    id_to_index: HashMap<NoteId, usize>,

    /// Map from address to node index for fast lookups
    address_to_index: HashMap<EventAddress, usize>,
}

impl PublicationTree {
    /// Index of the root node. The root is fixed at construction.
    pub const ROOT: usize = 0;

    /// Create a new publication tree rooted at `root`
    pub fn new(root: Event) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            id_to_index: HashMap::new(),
            address_to_index: HashMap::new(),
        };
        tree.push(PublicationTreeNode::new(root, None));
        tree
    }

    /// Add `event` as the last child of the node behind `parent`.
    ///
    /// Fails without touching the tree if the parent can't be found or if
    /// the event's id or address is already taken by another node.
    pub fn add_node(&mut self, event: Event, parent: &EventRef) -> Result<usize> {
        let parent_idx = self
            .index_of(parent)
            .ok_or_else(|| Error::ParentNotFound(parent.to_string()))?;

        let node = PublicationTreeNode::new(event, Some(parent_idx));

        if self.id_to_index.contains_key(node.id()) {
            return Err(Error::DuplicateNode(node.id().hex()));
        }
        if let Some(addr) = &node.address {
            if self.address_to_index.contains_key(addr) {
                return Err(Error::DuplicateNode(addr.to_string()));
            }
        }

        let idx = self.push(node);
        self.nodes[parent_idx].children.push(idx);

        trace!("added node {} under {}", idx, parent_idx);

        Ok(idx)
    }

    /// Get the root node
    pub fn root(&self) -> &PublicationTreeNode {
        &self.nodes[Self::ROOT]
    }

    /// Get a node by index
    pub fn node(&self, index: usize) -> Option<&PublicationTreeNode> {
        self.nodes.get(index)
    }

    /// Resolve a reference to a node index
    pub fn index_of(&self, key: &EventRef) -> Option<usize> {
        match key {
            EventRef::Id(id) => self.id_to_index.get(id).copied(),
            EventRef::Address(addr) => self.address_to_index.get(addr).copied(),
        }
    }

    /// Look a node up by id or address
    pub fn get(&self, key: &EventRef) -> Option<&PublicationTreeNode> {
        self.index_of(key).and_then(|idx| self.nodes.get(idx))
    }

    /// Look a node up by a hex id or a `kind:pubkey[:dtag]` address string.
    ///
    /// Keys that are neither shape resolve to nothing.
    pub fn get_node(&self, key: &str) -> Option<&PublicationTreeNode> {
        EventRef::parse(key).ok().and_then(|key| self.get(&key))
    }

    /// Whether `key` resolves to a node in this tree
    pub fn contains(&self, key: &EventRef) -> bool {
        self.index_of(key).is_some()
    }

    /// Parent of the node behind `key`; `None` for the root or an unknown key
    pub fn parent(&self, key: &EventRef) -> Option<&PublicationTreeNode> {
        self.get(key)
            .and_then(|node| node.parent)
            .and_then(|idx| self.nodes.get(idx))
    }

    /// Children of a node in insertion order
    pub fn children(&self, key: &EventRef) -> Vec<&PublicationTreeNode> {
        self.index_of(key)
            .map(|idx| self.children_at(idx))
            .unwrap_or_default()
    }

    /// The parent's other children, in order
    pub fn siblings(&self, key: &EventRef) -> Vec<&PublicationTreeNode> {
        let Some(idx) = self.index_of(key) else {
            return Vec::new();
        };
        let Some(parent) = self.nodes[idx].parent else {
            return Vec::new();
        };

        self.nodes[parent]
            .children
            .iter()
            .filter(|&&child| child != idx)
            .filter_map(|&child| self.nodes.get(child))
            .collect()
    }

    /// Children of the node at `index`, in insertion order
    pub fn children_at(&self, index: usize) -> Vec<&PublicationTreeNode> {
        self.nodes
            .get(index)
            .map(|n| {
                n.children
                    .iter()
                    .filter_map(|&idx| self.nodes.get(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the hierarchy (path from root to node)
    pub fn hierarchy(&self, index: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(index).map(|_| index);

        while let Some(idx) = current {
            path.push(idx);
            current = self.nodes.get(idx).and_then(|n| n.parent);
        }

        path.reverse();
        path
    }

    /// Get depth of a node (root is 0)
    pub fn depth(&self, index: usize) -> usize {
        self.hierarchy(index).len().saturating_sub(1)
    }

    /// Get total node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterator over all nodes in insertion order, root first
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PublicationTreeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Events in insertion order. Parents always come before their children.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.nodes.iter().map(|n| &n.event)
    }

    /// Iterator over all leaf nodes in reading order
    pub fn leaves(&self) -> impl Iterator<Item = (usize, &PublicationTreeNode)> {
        LeafIterator::new(self)
    }

    fn push(&mut self, node: PublicationTreeNode) -> usize {
        let idx = self.nodes.len();
        self.id_to_index.insert(*node.id(), idx);
        if let Some(addr) = &node.address {
            self.address_to_index.insert(addr.clone(), idx);
        }
        self.nodes.push(node);
        idx
    }
}

/// Iterator over leaf nodes in reading order (depth-first)
struct LeafIterator<'a> {
    tree: &'a PublicationTree,
    stack: Vec<usize>,
}

impl<'a> LeafIterator<'a> {
    fn new(tree: &'a PublicationTree) -> Self {
        Self {
            tree,
            stack: vec![PublicationTree::ROOT],
        }
    }
}

impl<'a> Iterator for LeafIterator<'a> {
    type Item = (usize, &'a PublicationTreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.stack.pop() {
            let node = self.tree.nodes.get(idx)?;

            if node.is_leaf() {
                return Some((idx, node));
            }

            // Index node: push children in reverse order
            for &child_idx in node.children.iter().rev() {
                self.stack.push(child_idx);
            }
        }
        None
    }
}
