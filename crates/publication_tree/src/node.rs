//! Publication tree node types
//!
//! Nodes represent either index (container) or leaf (content) events in
//! a publication tree.

use crate::address::EventAddress;
use crate::constants::is_index_kind;
use crate::event::Event;
use crate::id::NoteId;

/// Type of node in the publication tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Index node - a 30040 with ordered children and no content of its own
    Index,
    /// Leaf node - content (30041, 30818, 30023 or anything else)
    Leaf,
}

impl NodeType {
    pub fn from_kind(kind: u32) -> Self {
        if is_index_kind(kind) {
            NodeType::Index
        } else {
            NodeType::Leaf
        }
    }
}

/// A node in the publication tree
#[derive(Debug, Clone)]
pub struct PublicationTreeNode {
    /// Whether this is an index or a leaf
    pub node_type: NodeType,

    /// The event this node was built from
    pub event: Event,

    /// Address derived from the event kind, if it has one
    pub address: Option<EventAddress>,

    /// Index of parent node in the tree's node vector (None for root)
    pub parent: Option<usize>,

    /// Indices of child nodes in insertion order
    pub children: Vec<usize>,
}

impl PublicationTreeNode {
    /// Wrap `event`, deriving its role and address from the kind
    pub fn new(event: Event, parent: Option<usize>) -> Self {
        Self {
            node_type: NodeType::from_kind(event.kind),
            address: event.address(),
            event,
            parent,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &NoteId {
        &self.event.id
    }

    /// Title from the `title` tag, empty if there is none
    pub fn title(&self) -> &str {
        self.event.title().unwrap_or_default()
    }

    /// Content payload; only leaves carry one
    pub fn content(&self) -> Option<&str> {
        match self.node_type {
            NodeType::Leaf => Some(&self.event.content),
            NodeType::Index => None,
        }
    }

    /// Check if this node is the root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check if this node is a leaf (content)
    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Leaf
    }

    /// Check if this node is an index
    pub fn is_index(&self) -> bool {
        self.node_type == NodeType::Index
    }

    /// Get display title (falls back to d-tag if no title)
    pub fn display_title(&self) -> &str {
        match self.event.title() {
            Some(title) => title,
            None => self.event.dtag().unwrap_or_default(),
        }
    }
}
