//! # Storage Layer
//!
//! Two kinds of durable state with very different shapes:
//!
//! - [`pager`]: `index.db`, an mmap'd array of 4096-byte pages holding the
//!   B+tree, committed master-page-last so a crash never exposes a half
//!   written tree.
//! - [`heap`]: `tables.db` and `rows.db`, append-only logs of length
//!   prefixed frames, opened per operation.
//!
//! The invariant linking the three files: the B+tree maps table names to
//! catalog-row offsets in `tables.db`, and indexed column values to row
//! offsets in `rows.db`. The heap files know nothing about the tree.

pub mod heap;
pub mod pager;

pub use heap::HeapFile;
pub use pager::Pager;
