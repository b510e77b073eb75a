//! Domain layer: identifiers, entities and the document tree
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

mod clock;
pub mod document;
pub mod error;
pub mod ids;
pub mod node;
pub mod render;
pub mod tree;

pub use document::{Document, DocumentStatus};
pub use error::{DomainError, DomainResult};
pub use ids::{DocumentId, NodeId, UserId};
pub use node::{DocumentNode, NodeKind, NodeType};
pub use render::{RenderOptions, TreeRender};
pub use tree::{Ancestors, Descendants, DocumentTree};
