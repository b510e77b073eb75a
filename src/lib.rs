//! Document tree: folders and document references organized over a
//! separate content store.
//!
//! Layers, innermost first:
//! - [`domain`]: identifiers, documents, nodes and the arena-backed tree
//! - [`application`]: services coordinating documents and nodes
//! - [`infrastructure`]: repository contracts, in-memory storage, DI
//! - [`cli`]: the `doctree` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
