//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{DocumentTreeService, LayoutService};
use crate::config::Settings;
use crate::infrastructure::memory::{InMemoryDocumentRepository, InMemoryNodeRepository};
use crate::infrastructure::traits::{DocumentRepository, NodeRepository};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Document storage
    pub documents: Arc<dyn DocumentRepository>,

    /// Node storage
    pub nodes: Arc<dyn NodeRepository>,

    pub tree_service: DocumentTreeService,

    pub layout_service: LayoutService,
}

impl ServiceContainer {
    /// Create a container backed by in-memory repositories.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(InMemoryDocumentRepository::new()),
            Arc::new(InMemoryNodeRepository::new()),
        )
    }

    /// Create a service container with custom repositories (for testing).
    pub fn with_deps(
        settings: Settings,
        documents: Arc<dyn DocumentRepository>,
        nodes: Arc<dyn NodeRepository>,
    ) -> Self {
        let settings = Arc::new(settings);
        let tree_service = DocumentTreeService::new(documents.clone(), nodes.clone());
        let layout_service = LayoutService::new(tree_service.clone());

        Self {
            settings,
            documents,
            nodes,
            tree_service,
            layout_service,
        }
    }
}
