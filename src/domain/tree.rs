//! Arena-backed forest of document nodes.
//!
//! Every node of a forest lives in one generational arena and is addressed
//! by its [`NodeId`]. Parent and child links are ids, and the only code that
//! touches them is the private `attach`/`detach` pair below, so both sides of
//! a link always change together.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{DocumentId, NodeId, UserId};
use crate::domain::node::DocumentNode;

/// Forest of folders and document references.
#[derive(Debug, Default)]
pub struct DocumentTree {
    arena: Arena<DocumentNode>,
    index: HashMap<NodeId, Index>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            index: HashMap::new(),
        }
    }

    /// Rebuild a forest from node snapshots, e.g. as returned by a repository.
    ///
    /// Fails with `CorruptTree` if links are one-sided, point at missing
    /// nodes, repeat a child, hang children under a document node, or form
    /// a cycle.
    pub fn restore(nodes: impl IntoIterator<Item = DocumentNode>) -> DomainResult<Self> {
        let mut tree = Self::new();
        for node in nodes {
            let id = node.id();
            if tree.index.contains_key(&id) {
                return Err(DomainError::CorruptTree(format!("duplicate node {}", id)));
            }
            let idx = tree.arena.insert(node);
            tree.index.insert(id, idx);
        }

        for (_, node) in tree.arena.iter() {
            if let Some(parent_id) = node.parent() {
                let parent = tree.get(parent_id).ok_or_else(|| {
                    DomainError::CorruptTree(format!(
                        "node {} references missing parent {}",
                        node.id(),
                        parent_id
                    ))
                })?;
                if !parent.children().contains(&node.id()) {
                    return Err(DomainError::CorruptTree(format!(
                        "node {} is not listed as child of {}",
                        node.id(),
                        parent_id
                    )));
                }
            }
            if !node.children().iter().all_unique() {
                return Err(DomainError::CorruptTree(format!(
                    "node {} lists a child more than once",
                    node.id()
                )));
            }
            if !node.is_folder() && !node.children().is_empty() {
                return Err(DomainError::CorruptTree(format!(
                    "document node {} has children",
                    node.id()
                )));
            }
            for &child_id in node.children() {
                match tree.get(child_id) {
                    Some(child) if child.parent() == Some(node.id()) => {}
                    _ => {
                        return Err(DomainError::CorruptTree(format!(
                            "child {} of {} does not link back",
                            child_id,
                            node.id()
                        )))
                    }
                }
            }
        }

        // Consistent links with every chain ending at a root is a forest.
        let limit = tree.len();
        for (_, node) in tree.arena.iter() {
            if tree.ancestor_ids(node.id()).take(limit + 1).count() > limit {
                return Err(DomainError::CorruptTree(format!(
                    "cycle through node {}",
                    node.id()
                )));
            }
        }

        debug!("restore: {} nodes", tree.len());
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.index.get(&id).and_then(|&idx| self.arena.get(idx))
    }

    /// Like [`get`](Self::get) but fails with `NodeNotFound`.
    pub fn node(&self, id: NodeId) -> DomainResult<&DocumentNode> {
        self.get(id).ok_or(DomainError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut DocumentNode> {
        let idx = *self.index.get(&id).ok_or(DomainError::NodeNotFound(id))?;
        self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound(id))
    }

    /// All nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentNode> {
        self.arena.iter().map(|(_, node)| node)
    }

    /// Root nodes sorted by `order`, then creation time.
    pub fn roots(&self) -> Vec<&DocumentNode> {
        self.iter()
            .filter(|node| node.is_root())
            .sorted_by_key(|node| (node.order(), node.created_at()))
            .collect()
    }

    pub fn roots_for(&self, user: UserId) -> Vec<&DocumentNode> {
        self.roots()
            .into_iter()
            .filter(|node| node.created_by() == user)
            .collect()
    }

    /// Children of `id` in display order: by `order`, ties by insertion.
    pub fn children(&self, id: NodeId) -> DomainResult<Vec<&DocumentNode>> {
        let node = self.node(id)?;
        Ok(self.ordered_children(node))
    }

    fn ordered_children(&self, node: &DocumentNode) -> Vec<&DocumentNode> {
        node.children()
            .iter()
            .filter_map(|&child| self.get(child))
            .sorted_by_key(|child| child.order())
            .collect()
    }

    /// Insert a detached node, attaching it under `parent` if given.
    #[instrument(level = "trace", skip(self, node), fields(node = %node.id()))]
    pub fn insert(&mut self, node: DocumentNode, parent: Option<NodeId>) -> DomainResult<NodeId> {
        let id = node.id();
        if self.contains(id) {
            return Err(DomainError::InvalidOperation(format!(
                "node {} is already part of the tree",
                id
            )));
        }
        if node.parent().is_some() || !node.children().is_empty() {
            return Err(DomainError::InvalidArgument(format!(
                "node {} must be detached before insertion",
                id
            )));
        }
        if let Some(parent_id) = parent {
            self.ensure_folder(parent_id)?;
        }

        let idx = self.arena.insert(node);
        self.index.insert(id, idx);
        self.attach(id, parent);
        Ok(id)
    }

    pub fn create_folder(
        &mut self,
        name: impl Into<String>,
        created_by: UserId,
        parent: Option<NodeId>,
        order: i32,
    ) -> DomainResult<NodeId> {
        let node = DocumentNode::folder(name, created_by, order)?;
        self.insert(node, parent)
    }

    pub fn create_document_node(
        &mut self,
        name: impl Into<String>,
        document_id: DocumentId,
        created_by: UserId,
        parent: Option<NodeId>,
        order: i32,
    ) -> DomainResult<NodeId> {
        let node = DocumentNode::document(name, document_id, created_by, order)?;
        self.insert(node, parent)
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> DomainResult<()> {
        self.node_mut(id)?.rename(name)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn reorder(&mut self, id: NodeId, order: i32) -> DomainResult<()> {
        self.node_mut(id)?.reorder(order);
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    pub fn change_document(&mut self, id: NodeId, document_id: DocumentId) -> DomainResult<()> {
        self.node_mut(id)?.change_document(document_id)
    }

    /// Relocate `id` with its whole subtree under `new_parent`, or make it a
    /// root when `None`.
    #[instrument(level = "trace", skip(self))]
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: Option<NodeId>,
        new_order: i32,
    ) -> DomainResult<()> {
        self.node(id)?;
        if let Some(parent_id) = new_parent {
            if self.would_create_cycle(id, parent_id) {
                return Err(DomainError::CycleDetected {
                    node: id,
                    target: parent_id,
                });
            }
            self.ensure_folder(parent_id)?;
        }

        self.detach(id);
        self.attach(id, new_parent);
        let node = self.node_mut(id)?;
        node.set_order(new_order);
        node.touch();
        Ok(())
    }

    /// Attach `child` under `parent`, keeping the child's order.
    ///
    /// Re-adding a child that is already listed under `parent` changes nothing.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.ensure_folder(parent)?;
        if self.node(child)?.parent() == Some(parent) {
            debug!("add_child: {} already under {}", child, parent);
            return Ok(());
        }
        if self.would_create_cycle(child, parent) {
            return Err(DomainError::CycleDetected {
                node: child,
                target: parent,
            });
        }

        self.detach(child);
        self.attach(child, Some(parent));
        self.node_mut(child)?.touch();
        Ok(())
    }

    /// Detach `child` from `parent`, turning it into a root. No-op when
    /// `child` is not a child of `parent`.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.node(parent)?;
        let listed = self
            .get(child)
            .map(|node| node.parent() == Some(parent))
            .unwrap_or(false);
        if !listed {
            return Ok(());
        }

        self.detach(child);
        self.node_mut(child)?.touch();
        Ok(())
    }

    /// Detach `id` and drop its whole subtree from the arena.
    ///
    /// Returns the removed nodes in post-order with their links cleared.
    /// Referenced documents are not touched. Unknown ids yield an empty list.
    #[instrument(level = "trace", skip(self))]
    pub fn delete(&mut self, id: NodeId) -> Vec<DocumentNode> {
        if !self.contains(id) {
            debug!("delete: {} not in tree", id);
            return Vec::new();
        }

        self.detach(id);
        let doomed: Vec<NodeId> = PostOrder::new(self, id).map(|node| node.id()).collect();

        doomed
            .into_iter()
            .filter_map(|node_id| {
                let idx = self.index.remove(&node_id)?;
                let mut node = self.arena.remove(idx)?;
                node.clear_links();
                Some(node)
            })
            .collect()
    }

    /// Lazy pre-order walk of everything below `id` (excluding `id`).
    ///
    /// Siblings come in display order. The iterator borrows the tree, so the
    /// structure cannot change while it runs; calling again restarts.
    pub fn descendants(&self, id: NodeId) -> DomainResult<Descendants<'_>> {
        let node = self.node(id)?;
        Ok(Descendants::new(self, node))
    }

    /// Lazy walk from the parent of `id` up to its root.
    pub fn ancestors(&self, id: NodeId) -> DomainResult<Ancestors<'_>> {
        let node = self.node(id)?;
        Ok(Ancestors {
            tree: self,
            next: node.parent(),
        })
    }

    fn ancestor_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|n| n.parent()), move |&current| {
            self.get(current).and_then(|n| n.parent())
        })
    }

    /// `/`-joined names from the root down to `id`.
    pub fn path(&self, id: NodeId) -> DomainResult<String> {
        let node = self.node(id)?;
        let mut names: Vec<&str> = self.ancestors(id)?.map(|n| n.name()).collect();
        names.reverse();
        names.push(node.name());
        Ok(names.join("/"))
    }

    /// Distance from the root; roots are level 0.
    pub fn level(&self, id: NodeId) -> DomainResult<usize> {
        Ok(self.ancestors(id)?.count())
    }

    /// Ids of every document referenced in the subtree rooted at `id`,
    /// `id` included, without duplicates.
    pub fn all_document_ids(&self, id: NodeId) -> DomainResult<Vec<DocumentId>> {
        let node = self.node(id)?;
        Ok(std::iter::once(node)
            .chain(self.descendants(id)?)
            .filter_map(|n| n.document_id())
            .unique()
            .collect())
    }

    /// True if `candidate` is `node` itself or lies below it, i.e. attaching
    /// `node` under `candidate` would close a cycle.
    pub fn would_create_cycle(&self, node: NodeId, candidate: NodeId) -> bool {
        candidate == node || self.ancestor_ids(candidate).any(|id| id == node)
    }

    /// Resolve a `/`-separated name path. The first matching sibling wins.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut current = self.roots().into_iter().find(|n| n.name() == first)?;
        for segment in segments {
            current = self
                .ordered_children(current)
                .into_iter()
                .find(|n| n.name() == segment)?;
        }
        Some(current.id())
    }

    /// Subtree ids of `id` in pre-order, `id` first.
    pub fn subtree_ids(&self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let mut ids = vec![id];
        ids.extend(self.descendants(id)?.map(|n| n.id()));
        Ok(ids)
    }

    fn ensure_folder(&self, id: NodeId) -> DomainResult<()> {
        let node = self.node(id)?;
        if node.is_folder() {
            Ok(())
        } else {
            Err(DomainError::InvalidOperation(format!(
                "document node '{}' cannot have children",
                node.name()
            )))
        }
    }

    fn attach(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(parent_id) = parent {
            if let Some(&pidx) = self.index.get(&parent_id) {
                if let Some(parent_node) = self.arena.get_mut(pidx) {
                    parent_node.push_child(id);
                }
            }
        }
        if let Some(&idx) = self.index.get(&id) {
            if let Some(node) = self.arena.get_mut(idx) {
                node.set_parent(parent);
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(&idx) = self.index.get(&id) else {
            return;
        };
        let parent = self.arena.get(idx).and_then(|n| n.parent());
        if let Some(parent_id) = parent {
            if let Some(&pidx) = self.index.get(&parent_id) {
                if let Some(parent_node) = self.arena.get_mut(pidx) {
                    parent_node.drop_child(id);
                }
            }
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.set_parent(None);
        }
    }
}

pub struct Descendants<'a> {
    tree: &'a DocumentTree,
    stack: Vec<&'a DocumentNode>,
}

impl<'a> Descendants<'a> {
    fn new(tree: &'a DocumentTree, node: &'a DocumentNode) -> Self {
        let mut stack = tree.ordered_children(node);
        stack.reverse();
        Self { tree, stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack
            .extend(self.tree.ordered_children(current).into_iter().rev());
        Some(current)
    }
}

pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.get(self.next?)?;
        self.next = node.parent();
        Some(node)
    }
}

/// Post-order walk including the start node; children before parents.
struct PostOrder<'a> {
    tree: &'a DocumentTree,
    stack: Vec<(NodeId, bool)>,
    seen: HashSet<NodeId>,
}

impl<'a> PostOrder<'a> {
    fn new(tree: &'a DocumentTree, start: NodeId) -> Self {
        Self {
            tree,
            stack: vec![(start, false)],
            seen: HashSet::new(),
        }
    }
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            let Some(node) = self.tree.get(current) else {
                continue;
            };
            if visited {
                return Some(node);
            }
            if !self.seen.insert(current) {
                continue;
            }
            self.stack.push((current, true));
            for &child in node.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}
