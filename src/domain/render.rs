//! Text rendering of document trees via `termtree`.

use termtree::Tree;

use crate::domain::ids::NodeId;
use crate::domain::node::{DocumentNode, NodeKind};
use crate::domain::tree::DocumentTree;

/// What to show next to each node name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_ids: bool,
    pub show_order: bool,
}

pub trait TreeRender {
    /// One rendered tree per root, in root display order.
    fn to_tree_strings(&self, options: RenderOptions) -> Vec<Tree<String>>;

    /// Render the subtree below `id`, or `None` if the node is unknown.
    fn subtree_to_tree_string(&self, id: NodeId, options: RenderOptions) -> Option<Tree<String>>;
}

impl TreeRender for DocumentTree {
    fn to_tree_strings(&self, options: RenderOptions) -> Vec<Tree<String>> {
        self.roots()
            .into_iter()
            .filter_map(|root| self.subtree_to_tree_string(root.id(), options))
            .collect()
    }

    fn subtree_to_tree_string(&self, id: NodeId, options: RenderOptions) -> Option<Tree<String>> {
        let node = self.get(id)?;
        let leaves: Vec<Tree<String>> = self
            .children(id)
            .ok()?
            .into_iter()
            .filter_map(|child| self.subtree_to_tree_string(child.id(), options))
            .collect();
        Some(Tree::new(label(node, options)).with_leaves(leaves))
    }
}

fn label(node: &DocumentNode, options: RenderOptions) -> String {
    let mut label = match node.kind() {
        NodeKind::Folder => format!("{}/", node.name()),
        NodeKind::Document(_) => node.name().to_string(),
    };
    if options.show_order {
        label.push_str(&format!(" #{}", node.order()));
    }
    if options.show_ids {
        label.push_str(&format!(" [{}]", node.id()));
    }
    label
}
