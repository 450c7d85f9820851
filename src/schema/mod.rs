//! # Schema Module
//!
//! Table metadata: the in-memory [`Catalog`] the VM consults, the
//! [`TableDef`]/[`ColumnDef`] shapes it holds, and the codec for the
//! catalog rows persisted in `tables.db`.

pub mod catalog;
pub mod persistence;
pub mod table;

pub use catalog::Catalog;
pub use table::{ColumnDef, TableDef};
