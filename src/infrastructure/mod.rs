//! Infrastructure layer: repository contracts, in-memory storage and DI container

pub mod di;
pub mod error;
pub mod memory;
pub mod traits;

pub use error::{InfraError, InfraResult, RepositoryError, RepositoryResult};
