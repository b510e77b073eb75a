//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::ids::NodeId;

/// Domain errors represent violations of the tree and document invariants.
/// They are raised before any state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("cycle detected: node {target} is {node} or one of its descendants")]
    CycleDetected { node: NodeId, target: NodeId },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("corrupt tree: {0}")]
    CorruptTree(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
