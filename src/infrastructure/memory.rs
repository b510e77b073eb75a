//! In-memory repositories
//!
//! Each repository keeps a committed map plus a list of staged changes.
//! Reads see staged changes; `commit` applies them in order and `discard`
//! drops them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use itertools::Itertools;
use tracing::debug;

use crate::domain::{Document, DocumentId, DocumentNode, NodeId, UserId};
use crate::infrastructure::error::{RepositoryError, RepositoryResult};
use crate::infrastructure::traits::{DocumentRepository, NodeRepository};

#[derive(Debug, Clone)]
enum Change<T> {
    Put(T),
    Delete,
}

#[derive(Debug)]
struct Store<K, T> {
    committed: HashMap<K, T>,
    staged: Vec<(K, Change<T>)>,
}

impl<K: Eq + Hash + Copy, T: Clone> Store<K, T> {
    fn new() -> Self {
        Self {
            committed: HashMap::new(),
            staged: Vec::new(),
        }
    }

    fn get(&self, key: K) -> Option<T> {
        // Latest staged change wins over committed state
        match self.staged.iter().rev().find(|(k, _)| *k == key) {
            Some((_, Change::Put(value))) => Some(value.clone()),
            Some((_, Change::Delete)) => None,
            None => self.committed.get(&key).cloned(),
        }
    }

    fn values(&self) -> Vec<T> {
        let mut view: HashMap<K, T> = self.committed.clone();
        for (key, change) in &self.staged {
            match change {
                Change::Put(value) => {
                    view.insert(*key, value.clone());
                }
                Change::Delete => {
                    view.remove(key);
                }
            }
        }
        view.into_values().collect()
    }

    fn stage(&mut self, key: K, change: Change<T>) {
        self.staged.push((key, change));
    }

    fn commit(&mut self) -> usize {
        let applied = self.staged.len();
        for (key, change) in self.staged.drain(..) {
            match change {
                Change::Put(value) => {
                    self.committed.insert(key, value);
                }
                Change::Delete => {
                    self.committed.remove(&key);
                }
            }
        }
        applied
    }
}

fn poisoned<E>(_: E) -> RepositoryError {
    RepositoryError::Unavailable("repository lock poisoned".to_string())
}

/// Documents kept in process memory.
#[derive(Debug)]
pub struct InMemoryDocumentRepository {
    store: RwLock<Store<DocumentId, Document>>,
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::new()),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Store<DocumentId, Document>>> {
        self.store.read().map_err(poisoned)
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Store<DocumentId, Document>>> {
        self.store.write().map_err(poisoned)
    }

    /// Drop all staged changes.
    pub fn discard(&self) -> RepositoryResult<()> {
        self.write()?.staged.clear();
        Ok(())
    }

    /// Number of committed documents.
    pub fn committed_len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.committed.len())
    }

    pub fn staged_len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.staged.len())
    }
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn get(&self, id: DocumentId) -> RepositoryResult<Option<Document>> {
        Ok(self.read()?.get(id))
    }

    fn add(&self, document: &Document) -> RepositoryResult<()> {
        self.write()?
            .stage(document.id(), Change::Put(document.clone()));
        Ok(())
    }

    fn remove(&self, document: &Document) -> RepositoryResult<()> {
        self.write()?.stage(document.id(), Change::Delete);
        Ok(())
    }

    fn commit(&self) -> RepositoryResult<()> {
        let applied = self.write()?.commit();
        debug!("documents commit: {} changes", applied);
        Ok(())
    }
}

/// Node snapshots kept in process memory.
#[derive(Debug)]
pub struct InMemoryNodeRepository {
    store: RwLock<Store<NodeId, DocumentNode>>,
}

impl Default for InMemoryNodeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNodeRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::new()),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Store<NodeId, DocumentNode>>> {
        self.store.read().map_err(poisoned)
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Store<NodeId, DocumentNode>>> {
        self.store.write().map_err(poisoned)
    }

    /// Drop all staged changes.
    pub fn discard(&self) -> RepositoryResult<()> {
        self.write()?.staged.clear();
        Ok(())
    }

    /// Number of committed nodes.
    pub fn committed_len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.committed.len())
    }

    pub fn staged_len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.staged.len())
    }
}

impl NodeRepository for InMemoryNodeRepository {
    fn get(&self, id: NodeId) -> RepositoryResult<Option<DocumentNode>> {
        Ok(self.read()?.get(id))
    }

    fn get_roots(&self, user: UserId) -> RepositoryResult<Vec<DocumentNode>> {
        Ok(self
            .read()?
            .values()
            .into_iter()
            .filter(|node| node.is_root() && node.created_by() == user)
            .sorted_by_key(|node| (node.order(), node.created_at()))
            .collect())
    }

    fn add(&self, node: &DocumentNode) -> RepositoryResult<()> {
        self.write()?.stage(node.id(), Change::Put(node.clone()));
        Ok(())
    }

    fn remove(&self, node: &DocumentNode) -> RepositoryResult<()> {
        self.write()?.stage(node.id(), Change::Delete);
        Ok(())
    }

    fn commit(&self) -> RepositoryResult<()> {
        let applied = self.write()?.commit();
        debug!("nodes commit: {} changes", applied);
        Ok(())
    }
}
