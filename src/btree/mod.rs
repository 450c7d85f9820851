//! # B+Tree Module
//!
//! Copy-on-write B+tree keyed by byte strings, values byte strings. The
//! tree manipulates page images only; durable page allocation is supplied
//! by the pager through the [`PageStore`] trait.
//!
//! - [`node`]: single-page node layout and cell accessors
//! - [`tree`]: lookup, copy-on-write insert, node splitting

pub mod node;
pub mod tree;

pub use node::{BNode, NodeType};
pub use tree::{split3, BTree, PageStore};
