//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the repository traits but are themselves concrete
//! structs, not traits.

mod layout;
mod tree;

pub use layout::{Layout, LayoutEntry, LayoutService};
pub use tree::{DeletionReport, DocumentTreeService, DocumentWithNode, NewDocumentNode};
