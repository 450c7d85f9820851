//! # WinnieDB Configuration Constants
//!
//! This module centralizes the on-disk format constants and the database
//! configuration struct. Constants that depend on each other are co-located
//! so a change to one is visible next to the values it constrains.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> NODE_HEADER_SIZE (4 bytes: type u16 + nkeys u16)
//!       │
//!       ├─> MAX_KEY_SIZE (1000) ┐
//!       │                        ├─> one maximal cell must fit a page:
//!       └─> MAX_VAL_SIZE (3000) ┘    4 + 8 + 2 + 4 + 1000 + 3000 <= 4096
//!
//! MASTER_PAGE_SIZE (32 bytes, start of page 0)
//!       │
//!       └─> committed with a positional write, which is atomic only for
//!           payloads at or below the disk sector size
//!
//! FRAME_HEADER_SIZE (8 bytes: u32 LE length + 4 pad)
//!       │
//!       └─> shared by tables.db and rows.db; only the low 4 bytes of the
//!           header are interpreted on decode
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. A node holding one maximal key/value pair fits a page.
//! 2. The master page fits a disk sector.
//!
//! ## File Names
//!
//! The three store files have fixed names inside a database directory.
//! Components never hardcode the names; they go through [`DbConfig`] so
//! tests can point a database at a temporary directory.

use std::path::{Path, PathBuf};

/// Unit of storage in the B+tree file.
pub const PAGE_SIZE: usize = 4096;

/// Node header: type u16 + nkeys u16, little-endian.
pub const NODE_HEADER_SIZE: usize = 4;

/// Inclusive upper bound on B+tree key length. Keys are never empty.
pub const MAX_KEY_SIZE: usize = 1000;

/// Inclusive upper bound on B+tree value length. Empty values are legal.
pub const MAX_VAL_SIZE: usize = 3000;

/// Signature at offset 0 of the master page.
pub const DB_SIG: &[u8; 6] = b"winnie";

/// Bytes of page 0 occupied by the master page record.
pub const MASTER_PAGE_SIZE: usize = 32;

/// Length prefix (u32 LE) plus 4 pad bytes on every tables.db / rows.db frame.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Operand stack capacity of the virtual machine.
pub const VM_STACK_SIZE: usize = 2040;

/// Longest accepted identifier (table or column name), in bytes.
pub const MAX_IDENT_LEN: usize = 255;

/// Catalog rows live here, one framed record per CREATE TABLE.
pub const TABLES_FILE: &str = "tables.db";

/// Data rows live here, one framed record per INSERT.
pub const ROWS_FILE: &str = "rows.db";

/// B+tree page file; page 0 carries the master page.
pub const INDEX_FILE: &str = "index.db";

const _: () = assert!(NODE_HEADER_SIZE + 8 + 2 + 4 + MAX_KEY_SIZE + MAX_VAL_SIZE <= PAGE_SIZE);
const _: () = assert!(MASTER_PAGE_SIZE <= 512);
const _: () = assert!(PAGE_SIZE % MASTER_PAGE_SIZE == 0);

/// Locations of the three store files.
///
/// The file names are fixed by the on-disk format; only the directory they
/// live in is configurable. A default config resolves against the current
/// working directory, which is what the CLI uses.
#[derive(Debug, Clone)]
pub struct DbConfig {
    root: PathBuf,
}

impl DbConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables_path(&self) -> PathBuf {
        self.root.join(TABLES_FILE)
    }

    pub fn rows_path(&self) -> PathBuf {
        self.root.join(ROWS_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
