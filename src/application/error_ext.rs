//! Error conversion helpers
//!
//! Extension traits that attach context when lifting I/O and repository
//! failures into `ApplicationError`.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::error::RepositoryResult;

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// std::fs::read_to_string(&path)
    ///     .with_path_context("read layout", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Extension trait for converting `RepositoryResult` to `ApplicationResult`.
pub trait RepositoryResultExt<T> {
    /// Name the action and the entity involved.
    ///
    /// # Example
    /// ```ignore
    /// self.documents.add(&document)
    ///     .with_entity_context("add document", document.id())?;
    /// ```
    fn with_entity_context(
        self,
        action: &str,
        entity: impl std::fmt::Display,
    ) -> ApplicationResult<T>;
}

impl<T> RepositoryResultExt<T> for RepositoryResult<T> {
    fn with_entity_context(
        self,
        action: &str,
        entity: impl std::fmt::Display,
    ) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::Repository {
            context: format!("{}: {}", action, entity),
            source,
        })
    }
}
