//! Source documents for decomposition

use std::hash::Hash;

/// Structural context of section blocks. Sections become index nodes,
/// every other context becomes a leaf.
pub const SECTION_CONTEXT: &str = "section";

/// A hierarchical document that can be split into publication nodes.
///
/// Blocks are handles into the document; containers (sections) nest other
/// blocks, everything else is terminal.
pub trait DocumentSource {
    type Block: Copy + Eq + Hash;

    /// Document title, used for the root node
    fn title(&self) -> Option<&str>;

    /// Explicit document id, if the source declares one
    fn id(&self) -> Option<&str>;

    /// Top-level blocks in document order
    fn blocks(&self) -> Vec<Self::Block>;

    /// Child blocks of a container, in document order
    fn children(&self, block: Self::Block) -> Vec<Self::Block>;

    /// Structural context label, e.g. `section`, `paragraph`, `listing`
    fn context(&self, block: Self::Block) -> &str;

    fn block_id(&self, block: Self::Block) -> Option<&str>;

    fn block_title(&self, block: Self::Block) -> Option<&str>;

    /// Containing block; `None` for top-level blocks
    fn parent(&self, block: Self::Block) -> Option<Self::Block>;

    /// Source text of a terminal block
    fn source(&self, block: Self::Block) -> String;

    fn is_section(&self, block: Self::Block) -> bool {
        self.context(block) == SECTION_CONTEXT
    }
}
