//! Persistence boundary traits
//!
//! The document and node aggregates are stored through these narrow
//! repository contracts. Services depend on the traits only, so storage can
//! be swapped (or mocked in tests) without touching the tree logic.
//!
//! Writes are staged until `commit()`. The two repositories are independent:
//! committing one never commits the other.

use crate::domain::{Document, DocumentId, DocumentNode, NodeId, UserId};
use crate::infrastructure::error::RepositoryResult;

/// Storage for document aggregates.
pub trait DocumentRepository: Send + Sync {
    /// Fetch a document, `None` if unknown.
    fn get(&self, id: DocumentId) -> RepositoryResult<Option<Document>>;

    /// Stage an insert or replace.
    fn add(&self, document: &Document) -> RepositoryResult<()>;

    /// Stage a removal. Removing an unknown document is not an error.
    fn remove(&self, document: &Document) -> RepositoryResult<()>;

    /// Make staged changes durable.
    fn commit(&self) -> RepositoryResult<()>;
}

/// Storage for tree node snapshots.
pub trait NodeRepository: Send + Sync {
    /// Fetch a node snapshot, `None` if unknown.
    fn get(&self, id: NodeId) -> RepositoryResult<Option<DocumentNode>>;

    /// Root nodes created by `user`.
    fn get_roots(&self, user: UserId) -> RepositoryResult<Vec<DocumentNode>>;

    /// Stage an insert or replace.
    fn add(&self, node: &DocumentNode) -> RepositoryResult<()>;

    /// Stage a removal. Removing an unknown node is not an error.
    fn remove(&self, node: &DocumentNode) -> RepositoryResult<()>;

    /// Make staged changes durable.
    fn commit(&self) -> RepositoryResult<()>;
}
