//! NKBIP-01 Publication Trees
//!
//! A publication is a tree of Nostr events: `30040` index events list their
//! children through ordered `a` (and `e`) tags, and content events such as
//! `30041` hold the text. This crate provides:
//!
//! - [`PublicationTree`]: an arena-backed tree indexed by event id and by
//!   address
//! - [`TreeResolver`]: lazy, depth-first expansion of a tree from a
//!   [`BackingStore`] until a target node turns up
//! - [`Decomposer`]: splitting a document into addressable events with
//!   stable d-tags
//! - [`reconstruct`] / [`retrieve_section`]: rebuilding document text from
//!   a subtree
//!
//! # Event Kinds
//!
//! - `30040`: Publication Index - ordered list of references to content events
//! - `30041`: Publication Content - actual readable text sections
//! - `30818`: Wiki Note - wiki-style content (also supported)
//! - `30023`: Long-form Article - markdown content (also supported)
//!
//! # Example
//!
//! ```ignore
//! use publication_tree::{EventRef, PublicationTree, ResolverConfig, TreeResolver};
//!
//! let mut tree = PublicationTree::new(root_event);
//! let resolver = TreeResolver::new(&store, ResolverConfig::default());
//!
//! let target = EventRef::parse("30041:<pubkey>:introduction")?;
//! if let Some(idx) = resolver.resolve(&mut tree, &target).await? {
//!     println!("{}", tree.node(idx).unwrap().display_title());
//! }
//! ```

pub mod address;
pub mod asciidoc;
pub mod constants;
pub mod decompose;
pub mod document;
pub mod dtag;
mod error;
pub mod event;
mod id;
pub mod node;
pub mod reconstruct;
pub mod resolver;
pub mod store;
pub mod tree;

pub use address::{AddressError, AddressShape, EventAddress, EventRef};
pub use constants::*;
pub use decompose::{DecomposeOptions, Decomposer};
pub use document::DocumentSource;
pub use dtag::normalize_dtag;
pub use error::Error;
pub use event::Event;
pub use id::{NoteId, Pubkey};
pub use node::{NodeType, PublicationTreeNode};
pub use reconstruct::{reconstruct, retrieve_section, MarkupRenderer};
pub use resolver::{ResolveStats, ResolverConfig, TreeResolver};
pub use store::{BackingStore, Filter, MemoryStore};
pub use tree::PublicationTree;

pub type Result<T> = std::result::Result<T, error::Error>;
