//! Rebuilding document text from a publication subtree
//!
//! Headings are anchored at a node's depth in the whole publication, so
//! rendering an interior section keeps its real heading level.

use crate::address::EventRef;
use crate::constants::HEADING_MARKER;
use crate::node::NodeType;
use crate::resolver::TreeResolver;
use crate::store::BackingStore;
use crate::tree::PublicationTree;
use crate::{Error, Result};

/// Turns reconstructed markup into its final form (HTML, terminal text, ...)
pub trait MarkupRenderer {
    type Output;

    fn render(&self, markup: &str) -> Self::Output;
}

impl<F, O> MarkupRenderer for F
where
    F: Fn(&str) -> O,
{
    type Output = O;

    fn render(&self, markup: &str) -> O {
        self(markup)
    }
}

/// Reconstruct the text of the subtree rooted at `root`
pub fn reconstruct(tree: &PublicationTree, root: &EventRef) -> Result<String> {
    let idx = tree
        .index_of(root)
        .ok_or_else(|| Error::NodeNotFound(root.to_string()))?;

    Ok(reconstruct_node(tree, idx, tree.depth(idx)))
}

/// Heading line for a node `depth` levels below the publication root
pub fn heading(title: &str, depth: usize) -> String {
    let marker = HEADING_MARKER.to_string().repeat(depth + 1);
    format!("{marker} {title}")
}

fn reconstruct_node(tree: &PublicationTree, idx: usize, depth: usize) -> String {
    let Some(node) = tree.node(idx) else {
        return String::new();
    };

    let mut parts: Vec<String> = Vec::new();

    if !node.title().is_empty() {
        parts.push(heading(node.title(), depth));
    }

    match node.node_type {
        NodeType::Leaf => {
            let content = node.content().unwrap_or_default();
            if !content.is_empty() {
                parts.push(content.to_string());
            }
        }
        NodeType::Index => {
            for &child in &node.children {
                let text = reconstruct_node(tree, child, depth + 1);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
    }

    parts.join("\n\n")
}

/// Render the section that contains `target`.
///
/// The target is resolved first, fetching from the backing store as needed.
/// The subtree under its parent is then loaded in full, reconstructed and
/// handed to `renderer`. When the target is the publication root the whole
/// publication is rendered.
pub async fn retrieve_section<S, R>(
    resolver: &TreeResolver<'_, S>,
    tree: &mut PublicationTree,
    target: &EventRef,
    renderer: &R,
) -> Result<R::Output>
where
    S: BackingStore,
    R: MarkupRenderer,
{
    let idx = resolver
        .resolve(tree, target)
        .await?
        .ok_or_else(|| Error::TargetNotFound(target.to_string()))?;

    let section = tree
        .node(idx)
        .and_then(|node| node.parent)
        .unwrap_or(PublicationTree::ROOT);

    resolver.expand(tree, section).await?;

    let text = reconstruct_node(tree, section, tree.depth(section));
    Ok(renderer.render(&text))
}
