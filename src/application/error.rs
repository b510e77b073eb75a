//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::error::RepositoryError;

/// Application errors wrap domain errors and add application-level context.
///
/// Domain errors pass through unchanged so callers can match on
/// `InvalidArgument`, `InvalidOperation` and `CycleDetected` directly.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("repository error: {context}")]
    Repository {
        context: String,
        #[source]
        source: RepositoryError,
    },

    #[error("invalid layout at {location}: {message}")]
    Layout { location: String, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// The domain error behind this error, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
