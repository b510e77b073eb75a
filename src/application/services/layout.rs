//! Layout import
//!
//! Builds a document tree from a TOML description. Entries with `title`
//! and `content` become document nodes; entries with neither become folders.
//!
//! ```toml
//! [[nodes]]
//! name = "Handbook"
//!
//!   [[nodes.children]]
//!   name = "Welcome"
//!   title = "Welcome aboard"
//!   content = "First steps"
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::application::services::tree::{DocumentTreeService, NewDocumentNode};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{DocumentTree, NodeId, UserId};

/// Parsed layout file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Layout {
    pub nodes: Vec<LayoutEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LayoutEntry {
    pub name: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    /// Defaults to the entry's position among its siblings.
    pub order: Option<i32>,
    #[serde(default)]
    pub children: Vec<LayoutEntry>,
}

pub struct LayoutService {
    tree_service: DocumentTreeService,
}

impl LayoutService {
    pub fn new(tree_service: DocumentTreeService) -> Self {
        Self { tree_service }
    }

    /// Read and parse a layout file.
    pub fn load(&self, path: &Path) -> ApplicationResult<Layout> {
        debug!("load: path={}", path.display());
        let content = std::fs::read_to_string(path).with_path_context("read layout", path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse layout TOML; `location` names the source in error messages.
    pub fn parse(content: &str, location: &str) -> ApplicationResult<Layout> {
        toml::from_str(content).map_err(|e| ApplicationError::Layout {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    /// Build a fresh tree owned by `owner`, persisting every node and
    /// document through the tree service.
    pub fn import(&self, layout: &Layout, owner: UserId) -> ApplicationResult<DocumentTree> {
        let mut tree = DocumentTree::new();
        for (position, entry) in layout.nodes.iter().enumerate() {
            self.import_entry(&mut tree, entry, None, position, owner)?;
        }
        debug!("import: {} nodes", tree.len());
        Ok(tree)
    }

    fn import_entry(
        &self,
        tree: &mut DocumentTree,
        entry: &LayoutEntry,
        parent: Option<NodeId>,
        position: usize,
        owner: UserId,
    ) -> ApplicationResult<NodeId> {
        let order = entry
            .order
            .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX));

        match (&entry.title, &entry.content) {
            (Some(title), Some(content)) => {
                if !entry.children.is_empty() {
                    return Err(self.entry_error(
                        tree,
                        parent,
                        entry,
                        "document entries cannot have children",
                    ));
                }
                let mut request = NewDocumentNode::new(&entry.name, title, content, owner)
                    .with_order(order);
                request.parent = parent;
                request.description = entry.description.clone();
                self.tree_service.create_document_with_node(tree, request)
            }
            (None, None) => {
                let id = self
                    .tree_service
                    .create_folder(tree, &entry.name, owner, parent, order)?;
                for (child_position, child) in entry.children.iter().enumerate() {
                    self.import_entry(tree, child, Some(id), child_position, owner)?;
                }
                Ok(id)
            }
            _ => Err(self.entry_error(
                tree,
                parent,
                entry,
                "documents need both title and content",
            )),
        }
    }

    fn entry_error(
        &self,
        tree: &DocumentTree,
        parent: Option<NodeId>,
        entry: &LayoutEntry,
        message: &str,
    ) -> ApplicationError {
        let location = match parent.and_then(|p| tree.path(p).ok()) {
            Some(parent_path) => format!("{}/{}", parent_path, entry.name),
            None => entry.name.clone(),
        };
        ApplicationError::Layout {
            location,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_toml_when_parsed_then_children_present() {
        let layout = LayoutService::parse(
            r#"
[[nodes]]
name = "Root"

  [[nodes.children]]
  name = "Doc"
  title = "T"
  content = "C"
  order = 5
"#,
            "inline",
        )
        .unwrap();

        assert_eq!(layout.nodes.len(), 1);
        assert_eq!(layout.nodes[0].children[0].order, Some(5));
    }

    #[test]
    fn given_malformed_toml_when_parsed_then_layout_error_names_location() {
        let err = LayoutService::parse("[[nodes]]\nname = ", "broken.toml").unwrap_err();
        assert!(matches!(err, ApplicationError::Layout { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
