//! Document tree coordination service
//!
//! Keeps the document aggregate and the node aggregate consistent for
//! operations that span both. The two repositories are written in separate
//! steps; there is no shared transaction.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::{ApplicationResult, RepositoryResultExt};
use crate::domain::{Document, DocumentId, DocumentNode, DocumentTree, NodeId, UserId};
use crate::infrastructure::traits::{DocumentRepository, NodeRepository};

/// Input for [`DocumentTreeService::create_document_with_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocumentNode {
    pub node_name: String,
    pub title: String,
    pub content: String,
    pub created_by: UserId,
    pub parent: Option<NodeId>,
    pub description: Option<String>,
    pub order: i32,
}

impl NewDocumentNode {
    /// Root-level request with no description and order 0.
    pub fn new(
        node_name: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        created_by: UserId,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            title: title.into(),
            content: content.into(),
            created_by,
            parent: None,
            description: None,
            order: 0,
        }
    }

    pub fn under(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// A document node paired with the document it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWithNode {
    pub node: DocumentNode,
    pub document: Document,
}

/// Outcome of [`DocumentTreeService::delete_document_node`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Removed node ids, children before parents.
    pub removed_nodes: Vec<NodeId>,
    /// Documents deleted because deletion was requested.
    pub deleted_documents: Vec<DocumentId>,
    /// Referenced documents that were already gone.
    pub missing_documents: Vec<DocumentId>,
}

/// Service coordinating documents and tree nodes.
#[derive(Clone)]
pub struct DocumentTreeService {
    documents: Arc<dyn DocumentRepository>,
    nodes: Arc<dyn NodeRepository>,
}

impl DocumentTreeService {
    pub fn new(documents: Arc<dyn DocumentRepository>, nodes: Arc<dyn NodeRepository>) -> Self {
        Self { documents, nodes }
    }

    /// Create a folder under `parent` (or as a root) and persist it.
    pub fn create_folder(
        &self,
        tree: &mut DocumentTree,
        name: &str,
        created_by: UserId,
        parent: Option<NodeId>,
        order: i32,
    ) -> ApplicationResult<NodeId> {
        debug!("create_folder: name={}, parent={:?}", name, parent);
        let id = tree.create_folder(name, created_by, parent, order)?;

        if let Err(e) = self.persist_attached(tree, id) {
            warn!("create_folder: node {} not persisted, rolling back", id);
            self.compensate_node(tree, id);
            return Err(e);
        }
        Ok(id)
    }

    /// Create a document and a node referencing it, attached under
    /// `request.parent`.
    ///
    /// Everything that can be validated in memory is checked before the
    /// first repository write. The document is committed first; if the node
    /// step fails afterwards, the node is dropped from `tree`, the document
    /// removal is committed, and the node error is returned. Failures during
    /// that compensation are logged, not returned.
    pub fn create_document_with_node(
        &self,
        tree: &mut DocumentTree,
        request: NewDocumentNode,
    ) -> ApplicationResult<NodeId> {
        debug!(
            "create_document_with_node: name={}, parent={:?}",
            request.node_name, request.parent
        );
        let document = Document::new(
            request.title,
            request.content,
            request.created_by,
            request.description,
        )?;
        let node = DocumentNode::document(
            request.node_name,
            document.id(),
            request.created_by,
            request.order,
        )?;
        let node_id = tree.insert(node, request.parent)?;

        if let Err(e) = self.persist_document(&document) {
            tree.delete(node_id);
            self.unstage_document(&document);
            return Err(e);
        }

        if let Err(e) = self.persist_attached(tree, node_id) {
            warn!(
                "create_document_with_node: node {} not persisted, rolling back document {}",
                node_id,
                document.id()
            );
            self.compensate_node(tree, node_id);
            self.compensate_document(&document);
            return Err(e);
        }

        debug!(
            "create_document_with_node: node={}, document={}",
            node_id,
            document.id()
        );
        Ok(node_id)
    }

    /// Delete the subtree rooted at `node_id`.
    ///
    /// The structural deletion always happens. Referenced documents are only
    /// deleted when `delete_referenced_documents` is set; documents that no
    /// longer exist at that point are skipped. Unknown nodes yield an empty
    /// report.
    pub fn delete_document_node(
        &self,
        tree: &mut DocumentTree,
        node_id: NodeId,
        delete_referenced_documents: bool,
    ) -> ApplicationResult<DeletionReport> {
        debug!(
            "delete_document_node: node={}, delete_documents={}",
            node_id, delete_referenced_documents
        );
        let mut report = DeletionReport::default();
        if !tree.contains(node_id) {
            debug!("delete_document_node: {} not in tree", node_id);
            return Ok(report);
        }

        // Collect before mutating: the subtree is gone afterwards
        let document_ids = tree.all_document_ids(node_id)?;
        let parent = tree.node(node_id)?.parent();

        let removed = tree.delete(node_id);
        for node in &removed {
            self.nodes
                .remove(node)
                .with_entity_context("remove node", node.id())?;
        }
        if let Some(parent_node) = parent.and_then(|id| tree.get(id)) {
            self.nodes
                .add(parent_node)
                .with_entity_context("update node", parent_node.id())?;
        }
        self.nodes
            .commit()
            .with_entity_context("commit nodes", node_id)?;
        report.removed_nodes = removed.iter().map(|n| n.id()).collect();

        if delete_referenced_documents {
            for document_id in document_ids {
                match self
                    .documents
                    .get(document_id)
                    .with_entity_context("get document", document_id)?
                {
                    Some(document) => {
                        self.documents
                            .remove(&document)
                            .with_entity_context("remove document", document_id)?;
                        report.deleted_documents.push(document_id);
                    }
                    None => {
                        debug!("delete_document_node: document {} already gone", document_id);
                        report.missing_documents.push(document_id);
                    }
                }
            }
            self.documents
                .commit()
                .with_entity_context("commit documents", node_id)?;
        }

        debug!(
            "delete_document_node: removed {} nodes, {} documents",
            report.removed_nodes.len(),
            report.deleted_documents.len()
        );
        Ok(report)
    }

    /// Document-type descendants of `parent` with their documents.
    ///
    /// Nodes whose document cannot be found are left out.
    pub fn get_document_nodes_with_content(
        &self,
        tree: &DocumentTree,
        parent: NodeId,
    ) -> ApplicationResult<Vec<DocumentWithNode>> {
        debug!("get_document_nodes_with_content: parent={}", parent);
        let mut result = Vec::new();
        for node in tree.descendants(parent)? {
            let Some(document_id) = node.document_id() else {
                continue;
            };
            match self
                .documents
                .get(document_id)
                .with_entity_context("get document", document_id)?
            {
                Some(document) => result.push(DocumentWithNode {
                    node: node.clone(),
                    document,
                }),
                None => warn!(
                    "get_document_nodes_with_content: dangling reference {} -> {}",
                    node.id(),
                    document_id
                ),
            }
        }
        Ok(result)
    }

    /// Rebuild the forest owned by `user` from the node repository.
    pub fn load_tree(&self, user: UserId) -> ApplicationResult<DocumentTree> {
        debug!("load_tree: user={}", user);
        let roots = self
            .nodes
            .get_roots(user)
            .with_entity_context("get roots", user)?;

        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<DocumentNode> = roots.into_iter().collect();
        let mut collected = Vec::new();

        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.id()) {
                continue;
            }
            for &child_id in node.children() {
                // Missing children surface as a corrupt tree in restore()
                if let Some(child) = self
                    .nodes
                    .get(child_id)
                    .with_entity_context("get node", child_id)?
                {
                    queue.push_back(child);
                }
            }
            collected.push(node);
        }

        debug!("load_tree: {} nodes", collected.len());
        Ok(DocumentTree::restore(collected)?)
    }

    fn persist_document(&self, document: &Document) -> ApplicationResult<()> {
        self.documents
            .add(document)
            .with_entity_context("add document", document.id())?;
        self.documents
            .commit()
            .with_entity_context("commit document", document.id())
    }

    /// Stage the node and its parent (whose child list changed), then commit.
    fn persist_attached(&self, tree: &DocumentTree, id: NodeId) -> ApplicationResult<()> {
        let node = tree.node(id)?;
        self.nodes.add(node).with_entity_context("add node", id)?;
        if let Some(parent) = node.parent().and_then(|p| tree.get(p)) {
            self.nodes
                .add(parent)
                .with_entity_context("update node", parent.id())?;
        }
        self.nodes.commit().with_entity_context("commit node", id)
    }

    fn compensate_node(&self, tree: &mut DocumentTree, id: NodeId) {
        let parent = tree.get(id).and_then(|n| n.parent());
        for node in tree.delete(id) {
            if let Err(e) = self.nodes.remove(&node) {
                warn!("compensate: cannot unstage node {}: {}", node.id(), e);
            }
        }
        if let Some(parent_node) = parent.and_then(|p| tree.get(p)) {
            if let Err(e) = self.nodes.add(parent_node) {
                warn!("compensate: cannot restore parent {}: {}", parent_node.id(), e);
            }
        }
    }

    /// Drop a document whose commit failed from the staged changes.
    fn unstage_document(&self, document: &Document) {
        if let Err(e) = self.documents.remove(document) {
            warn!("compensate: cannot unstage document {}: {}", document.id(), e);
        }
    }

    fn compensate_document(&self, document: &Document) {
        let result = self
            .documents
            .remove(document)
            .and_then(|_| self.documents.commit());
        if let Err(e) = result {
            warn!(
                "compensate: document {} left orphaned: {}",
                document.id(),
                e
            );
        }
    }
}
