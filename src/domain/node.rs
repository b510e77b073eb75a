//! Tree node entity: a folder or a reference to a document.
//!
//! A node only knows the ids of its parent and children. The links are
//! maintained by [`DocumentTree`](crate::domain::DocumentTree), which owns
//! every node of a forest and updates both sides of a link together.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::clock;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{DocumentId, NodeId, UserId};

/// What a node is. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    /// Reference to a document aggregate, by id only.
    Document(DocumentId),
}

/// Discriminant of [`NodeKind`] without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Folder,
    Document,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Folder => write!(f, "folder"),
            NodeType::Document => write!(f, "document"),
        }
    }
}

/// Snapshots serialize with their links and timestamps so a store can hand
/// them back to [`DocumentTree::restore`](crate::domain::DocumentTree::restore).
/// Deserialization checks the name like the constructors do; link
/// consistency is checked by `restore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord")]
pub struct DocumentNode {
    id: NodeId,
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    /// Insertion order; display order is derived from `order` by the tree.
    children: Vec<NodeId>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    order: i32,
}

/// Stored form of a [`DocumentNode`].
#[derive(Deserialize)]
struct NodeRecord {
    id: NodeId,
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    #[serde(default)]
    children: Vec<NodeId>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    order: i32,
}

impl TryFrom<NodeRecord> for DocumentNode {
    type Error = DomainError;

    fn try_from(record: NodeRecord) -> DomainResult<Self> {
        validate_name(&record.name)?;
        Ok(Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            parent: record.parent,
            children: record.children,
            created_by: record.created_by,
            created_at: record.created_at,
            last_modified_at: record.last_modified_at,
            order: record.order,
        })
    }
}

impl DocumentNode {
    /// Create a detached folder node.
    pub fn folder(name: impl Into<String>, created_by: UserId, order: i32) -> DomainResult<Self> {
        Self::with_kind(name.into(), NodeKind::Folder, created_by, order)
    }

    /// Create a detached node referencing `document_id`.
    pub fn document(
        name: impl Into<String>,
        document_id: DocumentId,
        created_by: UserId,
        order: i32,
    ) -> DomainResult<Self> {
        Self::with_kind(
            name.into(),
            NodeKind::Document(document_id),
            created_by,
            order,
        )
    }

    fn with_kind(name: String, kind: NodeKind, created_by: UserId, order: i32) -> DomainResult<Self> {
        validate_name(&name)?;
        let now = Utc::now();
        Ok(Self {
            id: NodeId::new(),
            name,
            kind,
            parent: None,
            children: Vec::new(),
            created_by,
            created_at: now,
            last_modified_at: now,
            order,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Folder => NodeType::Folder,
            NodeKind::Document(_) => NodeType::Document,
        }
    }

    /// Referenced document; `None` for folders.
    pub fn document_id(&self) -> Option<DocumentId> {
        match self.kind {
            NodeKind::Folder => None,
            NodeKind::Document(id) => Some(id),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Child ids in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn reorder(&mut self, order: i32) {
        self.order = order;
        self.touch();
    }

    /// Point a document node at another document. Folders never carry one.
    pub fn change_document(&mut self, document_id: DocumentId) -> DomainResult<()> {
        match self.kind {
            NodeKind::Folder => Err(DomainError::InvalidOperation(format!(
                "folder '{}' cannot reference a document",
                self.name
            ))),
            NodeKind::Document(_) => {
                self.kind = NodeKind::Document(document_id);
                self.touch();
                Ok(())
            }
        }
    }

    pub(super) fn touch(&mut self) {
        self.last_modified_at = clock::advance(self.last_modified_at);
    }

    pub(super) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(super) fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    pub(super) fn push_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(super) fn drop_child(&mut self, child: NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|&c| c != child);
        self.children.len() != before
    }

    pub(super) fn clear_links(&mut self) {
        self.parent = None;
        self.children.clear();
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::InvalidArgument(
            "node name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_folder_when_created_then_no_document_and_detached() {
        let folder = DocumentNode::folder("Projects", UserId::new(), 3).unwrap();

        assert_eq!(folder.node_type(), NodeType::Folder);
        assert_eq!(folder.document_id(), None);
        assert!(folder.is_root());
        assert_eq!(folder.order(), 3);
    }

    #[test]
    fn given_blank_name_when_created_then_invalid_argument() {
        let result = DocumentNode::document(" ", DocumentId::new(), UserId::new(), 0);
        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn given_folder_when_changing_document_then_invalid_operation() {
        let mut folder = DocumentNode::folder("F", UserId::new(), 0).unwrap();

        let result = folder.change_document(DocumentId::new());

        assert!(matches!(result, Err(DomainError::InvalidOperation(_))));
        assert_eq!(folder.document_id(), None);
    }

    #[test]
    fn given_document_node_when_changing_document_then_reference_replaced() {
        let old = DocumentId::new();
        let new = DocumentId::new();
        let mut node = DocumentNode::document("D", old, UserId::new(), 0).unwrap();
        let before = node.last_modified_at();

        node.change_document(new).unwrap();

        assert_eq!(node.document_id(), Some(new));
        assert!(node.last_modified_at() > before);
    }

    #[test]
    fn given_empty_name_when_renamed_then_name_kept() {
        let mut node = DocumentNode::folder("Keep", UserId::new(), 0).unwrap();
        assert!(node.rename("").is_err());
        assert_eq!(node.name(), "Keep");
    }

    #[test]
    fn given_stored_document_node_when_read_back_then_identical() {
        let mut node = DocumentNode::document("Doc", DocumentId::new(), UserId::new(), 4).unwrap();
        node.set_parent(Some(NodeId::new()));

        let stored = toml::to_string(&node).unwrap();
        let loaded: DocumentNode = toml::from_str(&stored).unwrap();

        assert_eq!(loaded, node);
    }

    #[test]
    fn given_stored_node_with_blank_name_when_read_then_rejected() {
        let mut value = toml::Value::try_from(DocumentNode::folder("F", UserId::new(), 0).unwrap())
            .unwrap();
        value
            .as_table_mut()
            .unwrap()
            .insert("name".into(), toml::Value::String(String::new()));

        let result: Result<DocumentNode, _> = value.try_into();

        assert!(result.is_err());
    }
}
