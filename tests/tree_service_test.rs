//! Tests for DocumentTreeService against in-memory and failing repositories

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::{fixture, rstest};

use doctree::application::services::{DocumentTreeService, NewDocumentNode};
use doctree::application::ApplicationError;
use doctree::domain::{Document, DocumentId, DocumentNode, DocumentTree, NodeId, UserId};
use doctree::infrastructure::error::{RepositoryError, RepositoryResult};
use doctree::infrastructure::memory::{InMemoryDocumentRepository, InMemoryNodeRepository};
use doctree::infrastructure::traits::{DocumentRepository, NodeRepository};
use doctree::util::testing;

/// Node repository whose commit can be switched to fail.
#[derive(Default)]
struct FlakyNodeRepository {
    inner: InMemoryNodeRepository,
    fail_commit: AtomicBool,
}

impl FlakyNodeRepository {
    fn failing() -> Self {
        let repo = Self::default();
        repo.fail_commit.store(true, Ordering::SeqCst);
        repo
    }
}

impl NodeRepository for FlakyNodeRepository {
    fn get(&self, id: NodeId) -> RepositoryResult<Option<DocumentNode>> {
        self.inner.get(id)
    }

    fn get_roots(&self, user: UserId) -> RepositoryResult<Vec<DocumentNode>> {
        self.inner.get_roots(user)
    }

    fn add(&self, node: &DocumentNode) -> RepositoryResult<()> {
        self.inner.add(node)
    }

    fn remove(&self, node: &DocumentNode) -> RepositoryResult<()> {
        self.inner.remove(node)
    }

    fn commit(&self) -> RepositoryResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            self.inner.discard()?;
            return Err(RepositoryError::Unavailable("node store offline".into()));
        }
        self.inner.commit()
    }
}

/// Document repository that rejects every commit.
#[derive(Default)]
struct FailingDocumentRepository {
    inner: InMemoryDocumentRepository,
}

impl DocumentRepository for FailingDocumentRepository {
    fn get(&self, id: DocumentId) -> RepositoryResult<Option<Document>> {
        self.inner.get(id)
    }

    fn add(&self, document: &Document) -> RepositoryResult<()> {
        self.inner.add(document)
    }

    fn remove(&self, document: &Document) -> RepositoryResult<()> {
        self.inner.remove(document)
    }

    fn commit(&self) -> RepositoryResult<()> {
        self.inner.discard()?;
        Err(RepositoryError::Conflict("document version mismatch".into()))
    }
}

/// Node repository whose n-th `add` (1-based) fails; everything else works.
struct NthAddFailsNodeRepository {
    inner: InMemoryNodeRepository,
    calls: AtomicUsize,
    fail_on: usize,
}

impl NthAddFailsNodeRepository {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: InMemoryNodeRepository::new(),
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }
}

impl NodeRepository for NthAddFailsNodeRepository {
    fn get(&self, id: NodeId) -> RepositoryResult<Option<DocumentNode>> {
        self.inner.get(id)
    }

    fn get_roots(&self, user: UserId) -> RepositoryResult<Vec<DocumentNode>> {
        self.inner.get_roots(user)
    }

    fn add(&self, node: &DocumentNode) -> RepositoryResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(RepositoryError::Unavailable("write rejected".into()));
        }
        self.inner.add(node)
    }

    fn remove(&self, node: &DocumentNode) -> RepositoryResult<()> {
        self.inner.remove(node)
    }

    fn commit(&self) -> RepositoryResult<()> {
        self.inner.commit()
    }
}

/// Document repository whose commit can be switched to fail while keeping
/// the staged changes.
#[derive(Default)]
struct StickyDocumentRepository {
    inner: InMemoryDocumentRepository,
    fail_commit: AtomicBool,
}

impl DocumentRepository for StickyDocumentRepository {
    fn get(&self, id: DocumentId) -> RepositoryResult<Option<Document>> {
        self.inner.get(id)
    }

    fn add(&self, document: &Document) -> RepositoryResult<()> {
        self.inner.add(document)
    }

    fn remove(&self, document: &Document) -> RepositoryResult<()> {
        self.inner.remove(document)
    }

    fn commit(&self) -> RepositoryResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("document store offline".into()));
        }
        self.inner.commit()
    }
}

struct Fixture {
    service: DocumentTreeService,
    documents: Arc<InMemoryDocumentRepository>,
    nodes: Arc<InMemoryNodeRepository>,
    tree: DocumentTree,
    user: UserId,
}

#[fixture]
fn fx() -> Fixture {
    testing::init_test_setup();
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let nodes = Arc::new(InMemoryNodeRepository::new());
    Fixture {
        service: DocumentTreeService::new(documents.clone(), nodes.clone()),
        documents,
        nodes,
        tree: DocumentTree::new(),
        user: UserId::new(),
    }
}

/// Root -> Folder -> Doc, all persisted. Returns (root, folder, doc node, document).
fn seed(fx: &mut Fixture) -> (NodeId, NodeId, NodeId, DocumentId) {
    let root = fx
        .service
        .create_folder(&mut fx.tree, "Root", fx.user, None, 0)
        .unwrap();
    let folder = fx
        .service
        .create_folder(&mut fx.tree, "Folder", fx.user, Some(root), 0)
        .unwrap();
    let doc = fx
        .service
        .create_document_with_node(
            &mut fx.tree,
            NewDocumentNode::new("Doc", "Title", "Body", fx.user).under(folder),
        )
        .unwrap();
    let document_id = fx.tree.node(doc).unwrap().document_id().unwrap();
    (root, folder, doc, document_id)
}

// ============================================================
// create_document_with_node
// ============================================================

#[rstest]
fn given_parent_when_creating_document_then_both_persisted(mut fx: Fixture) {
    // Arrange
    let root = fx
        .service
        .create_folder(&mut fx.tree, "Root", fx.user, None, 0)
        .unwrap();

    // Act
    let id = fx
        .service
        .create_document_with_node(
            &mut fx.tree,
            NewDocumentNode::new("Readme", "Read me", "hello", fx.user)
                .under(root)
                .with_description("intro")
                .with_order(2),
        )
        .unwrap();

    // Assert
    let node = fx.tree.node(id).unwrap();
    assert_eq!(node.parent(), Some(root));
    assert_eq!(node.order(), 2);
    let document = fx.documents.get(node.document_id().unwrap()).unwrap().unwrap();
    assert_eq!(document.title(), "Read me");
    assert_eq!(document.description(), Some("intro"));
    assert_eq!(fx.nodes.get(id).unwrap().unwrap().parent(), Some(root));
    let stored_root = fx.nodes.get(root).unwrap().unwrap();
    assert!(stored_root.children().contains(&id));
}

#[rstest]
fn given_document_parent_when_creating_then_invalid_operation_nothing_persisted(mut fx: Fixture) {
    let (_, _, doc, _) = seed(&mut fx);
    let documents_before = fx.documents.committed_len().unwrap();
    let nodes_before = fx.tree.len();

    let result = fx.service.create_document_with_node(
        &mut fx.tree,
        NewDocumentNode::new("Child", "T", "C", fx.user).under(doc),
    );

    assert!(matches!(
        result.unwrap_err().as_domain(),
        Some(doctree::domain::DomainError::InvalidOperation(_))
    ));
    assert_eq!(fx.documents.committed_len().unwrap(), documents_before);
    assert_eq!(fx.tree.len(), nodes_before);
}

#[rstest]
fn given_blank_title_when_creating_then_invalid_argument(mut fx: Fixture) {
    let result = fx.service.create_document_with_node(
        &mut fx.tree,
        NewDocumentNode::new("Node", "   ", "C", fx.user),
    );

    assert!(matches!(
        result.unwrap_err().as_domain(),
        Some(doctree::domain::DomainError::InvalidArgument(_))
    ));
    assert_eq!(fx.documents.committed_len().unwrap(), 0);
}

#[test]
fn given_node_commit_fails_when_creating_then_document_compensated() {
    // Arrange
    testing::init_test_setup();
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let nodes = Arc::new(FlakyNodeRepository::failing());
    let service = DocumentTreeService::new(documents.clone(), nodes.clone());
    let mut tree = DocumentTree::new();

    // Act
    let result = service.create_document_with_node(
        &mut tree,
        NewDocumentNode::new("Doc", "Title", "Body", UserId::new()),
    );

    // Assert
    let err = result.unwrap_err();
    assert!(matches!(err, ApplicationError::Repository { .. }));
    assert!(tree.is_empty());
    assert_eq!(documents.committed_len().unwrap(), 0);
    assert_eq!(documents.staged_len().unwrap(), 0);
}

#[test]
fn given_node_commit_fails_under_parent_when_creating_then_parent_unchanged() {
    // Arrange
    testing::init_test_setup();
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let nodes = Arc::new(FlakyNodeRepository::default());
    let service = DocumentTreeService::new(documents.clone(), nodes.clone());
    let mut tree = DocumentTree::new();
    let user = UserId::new();
    let root = service
        .create_folder(&mut tree, "Root", user, None, 0)
        .unwrap();
    nodes.fail_commit.store(true, Ordering::SeqCst);

    // Act
    let result = service.create_document_with_node(
        &mut tree,
        NewDocumentNode::new("Doc", "Title", "Body", user).under(root),
    );

    // Assert
    assert!(result.is_err());
    assert_eq!(tree.len(), 1);
    assert!(tree.node(root).unwrap().children().is_empty());
    assert!(nodes.get(root).unwrap().unwrap().children().is_empty());
    assert_eq!(documents.committed_len().unwrap(), 0);
}

#[test]
fn given_document_commit_fails_when_creating_then_node_dropped() {
    testing::init_test_setup();
    let documents = Arc::new(FailingDocumentRepository::default());
    let nodes = Arc::new(InMemoryNodeRepository::new());
    let service = DocumentTreeService::new(documents, nodes.clone());
    let mut tree = DocumentTree::new();

    let result = service.create_document_with_node(
        &mut tree,
        NewDocumentNode::new("Doc", "Title", "Body", UserId::new()),
    );

    assert!(matches!(
        result,
        Err(ApplicationError::Repository {
            source: RepositoryError::Conflict(_),
            ..
        })
    ));
    assert!(tree.is_empty());
    assert_eq!(nodes.committed_len().unwrap(), 0);
}

// ============================================================
// create_folder
// ============================================================

#[test]
fn given_parent_update_fails_when_creating_folder_then_later_commit_persists_nothing_stale() {
    // Arrange: the third add is the Root update while attaching Child
    testing::init_test_setup();
    let documents = Arc::new(InMemoryDocumentRepository::new());
    let nodes = Arc::new(NthAddFailsNodeRepository::new(3));
    let service = DocumentTreeService::new(documents, nodes.clone());
    let mut tree = DocumentTree::new();
    let user = UserId::new();
    let root = service
        .create_folder(&mut tree, "Root", user, None, 0)
        .unwrap();

    // Act
    let failed = service.create_folder(&mut tree, "Child", user, Some(root), 0);
    let other = service
        .create_folder(&mut tree, "Other", user, None, 1)
        .unwrap();

    // Assert
    assert!(failed.is_err());
    assert_eq!(tree.len(), 2);
    assert_eq!(nodes.inner.committed_len().unwrap(), tree.len());
    assert!(nodes.get(other).unwrap().is_some());
    assert!(nodes.get(root).unwrap().unwrap().children().is_empty());
    assert!(tree.node(root).unwrap().children().is_empty());
}

#[test]
fn given_document_commit_fails_when_creating_then_later_commit_persists_nothing_stale() {
    // Arrange
    testing::init_test_setup();
    let documents = Arc::new(StickyDocumentRepository::default());
    let nodes = Arc::new(InMemoryNodeRepository::new());
    let service = DocumentTreeService::new(documents.clone(), nodes);
    let mut tree = DocumentTree::new();
    let user = UserId::new();
    documents.fail_commit.store(true, Ordering::SeqCst);

    // Act
    let failed =
        service.create_document_with_node(&mut tree, NewDocumentNode::new("A", "A", "a", user));
    documents.fail_commit.store(false, Ordering::SeqCst);
    let ok = service
        .create_document_with_node(&mut tree, NewDocumentNode::new("B", "B", "b", user))
        .unwrap();

    // Assert
    assert!(failed.is_err());
    assert_eq!(documents.inner.committed_len().unwrap(), 1);
    let kept = tree.node(ok).unwrap().document_id().unwrap();
    assert!(documents.get(kept).unwrap().is_some());
    assert_eq!(tree.len(), 1);
}

// ============================================================
// delete_document_node
// ============================================================

#[rstest]
fn given_subtree_when_deleted_without_flag_then_documents_kept(mut fx: Fixture) {
    // Arrange
    let (root, folder, doc, document_id) = seed(&mut fx);

    // Act
    let report = fx
        .service
        .delete_document_node(&mut fx.tree, folder, false)
        .unwrap();

    // Assert
    assert_eq!(report.removed_nodes, vec![doc, folder]);
    assert!(report.deleted_documents.is_empty());
    assert!(fx.documents.get(document_id).unwrap().is_some());
    assert!(fx.nodes.get(folder).unwrap().is_none());
    assert!(fx.nodes.get(doc).unwrap().is_none());
    assert!(fx.nodes.get(root).unwrap().unwrap().children().is_empty());
    assert_eq!(fx.tree.len(), 1);
}

#[rstest]
fn given_subtree_when_deleted_with_flag_then_documents_removed(mut fx: Fixture) {
    let (_, folder, _, document_id) = seed(&mut fx);

    let report = fx
        .service
        .delete_document_node(&mut fx.tree, folder, true)
        .unwrap();

    assert_eq!(report.deleted_documents, vec![document_id]);
    assert!(fx.documents.get(document_id).unwrap().is_none());
    assert_eq!(fx.documents.committed_len().unwrap(), 0);
}

#[rstest]
fn given_missing_document_when_deleted_with_flag_then_skipped(mut fx: Fixture) {
    // Arrange: the referenced document disappears behind the service's back
    let (_, folder, _, document_id) = seed(&mut fx);
    let document = fx.documents.get(document_id).unwrap().unwrap();
    fx.documents.remove(&document).unwrap();
    fx.documents.commit().unwrap();

    // Act
    let report = fx
        .service
        .delete_document_node(&mut fx.tree, folder, true)
        .unwrap();

    // Assert
    assert!(report.deleted_documents.is_empty());
    assert_eq!(report.missing_documents, vec![document_id]);
    assert_eq!(report.removed_nodes.len(), 2);
}

#[rstest]
fn given_unknown_node_when_deleting_then_empty_report(mut fx: Fixture) {
    seed(&mut fx);

    let report = fx
        .service
        .delete_document_node(&mut fx.tree, NodeId::new(), true)
        .unwrap();

    assert!(report.removed_nodes.is_empty());
    assert_eq!(fx.tree.len(), 3);
}

// ============================================================
// get_document_nodes_with_content
// ============================================================

#[rstest]
fn given_folder_when_listing_documents_then_pairs_in_pre_order(mut fx: Fixture) {
    // Arrange
    let (root, folder, doc, document_id) = seed(&mut fx);
    let second = fx
        .service
        .create_document_with_node(
            &mut fx.tree,
            NewDocumentNode::new("Second", "Two", "2", fx.user)
                .under(root)
                .with_order(5),
        )
        .unwrap();

    // Act
    let entries = fx
        .service
        .get_document_nodes_with_content(&fx.tree, root)
        .unwrap();

    // Assert
    let nodes: Vec<NodeId> = entries.iter().map(|e| e.node.id()).collect();
    assert_eq!(nodes, vec![doc, second]);
    assert_eq!(entries[0].document.id(), document_id);
    assert!(entries.iter().all(|e| e.node.id() != folder));
}

#[rstest]
fn given_dangling_reference_when_listing_documents_then_skipped(mut fx: Fixture) {
    let (root, _, _, _) = seed(&mut fx);
    fx.tree
        .create_document_node("Ghost", DocumentId::new(), fx.user, Some(root), 9)
        .unwrap();

    let entries = fx
        .service
        .get_document_nodes_with_content(&fx.tree, root)
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].node.name(), "Doc");
}

#[rstest]
fn given_unknown_parent_when_listing_documents_then_not_found(fx: Fixture) {
    let missing = NodeId::new();

    let err = fx
        .service
        .get_document_nodes_with_content(&fx.tree, missing)
        .unwrap_err();

    assert_eq!(
        err.as_domain(),
        Some(&doctree::domain::DomainError::NodeNotFound(missing))
    );
}

// ============================================================
// load_tree
// ============================================================

#[rstest]
fn given_persisted_nodes_when_loading_then_same_forest(mut fx: Fixture) {
    let (root, _, doc, document_id) = seed(&mut fx);

    let loaded = fx.service.load_tree(fx.user).unwrap();

    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.path(doc).unwrap(), "Root/Folder/Doc");
    assert_eq!(loaded.all_document_ids(root).unwrap(), vec![document_id]);
}

#[rstest]
fn given_other_user_when_loading_then_empty(mut fx: Fixture) {
    seed(&mut fx);

    let loaded = fx.service.load_tree(UserId::new()).unwrap();

    assert!(loaded.is_empty());
}
