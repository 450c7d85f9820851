//! # WinnieDB - Embeddable Relational Store
//!
//! WinnieDB is a single-process relational store driven by a small SQL
//! dialect. Statements typed at a prompt are lexed, parsed, compiled to
//! bytecode, and executed by a stack virtual machine backed by an on-disk
//! copy-on-write B+tree and two append-only data files.
//!
//! ## Quick Start
//!
//! ```ignore
//! use winniedb::database::{Database, Execution};
//!
//! let mut db = Database::open("./mydb")?;
//! db.execute("CREATE TABLE dogs (name varchar, breed varchar);")?;
//! db.execute("INSERT INTO dogs VALUES (\"winnie\", \"cane corso\");")?;
//!
//! if let Execution::Rows(rows) =
//!     db.execute("SELECT * FROM dogs WHERE breed = \"cane corso\";")?
//! {
//!     for row in rows {
//!         println!("{}", row.join(" "));
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            REPL (cli)                │
//! ├──────────────────────────────────────┤
//! │   Lexer → Parser → Compiler (sql)    │
//! ├──────────────────────────────────────┤
//! │      Bytecode Virtual Machine (vm)   │
//! ├───────────────┬──────────────────────┤
//! │  Catalog      │  Append Files        │
//! │  (schema)     │  tables.db / rows.db │
//! ├───────────────┴──────────────────────┤
//! │     Copy-on-Write B+Tree (btree)     │
//! ├──────────────────────────────────────┤
//! │   Pager: mmap + master page (storage)│
//! └──────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! A database directory holds three files:
//!
//! ```text
//! mydb/
//! ├── tables.db   # framed catalog rows, one per CREATE TABLE
//! ├── rows.db     # framed data rows, one per INSERT
//! └── index.db    # B+tree pages; page 0 carries the master page
//! ```
//!
//! The B+tree links the other two: it maps table names to catalog-row
//! offsets and indexed column values to data-row offsets.
//!
//! ## Module Overview
//!
//! - [`storage`]: mmap'd pager with master-page commits; framed heap files
//! - [`btree`]: copy-on-write B+tree over page-store capabilities
//! - [`schema`]: in-memory catalog and the catalog-row codec
//! - [`sql`]: lexer, recursive descent parser, bytecode compiler
//! - [`vm`]: operand objects, opcode table, and the stack machine
//! - [`cli`]: rustyline REPL and backslash meta-commands
//!
//! ## Scope
//!
//! Single writer, single thread, one statement at a time. There are no
//! multi-statement transactions and no WAL: B+tree mutations become
//! durable at flush granularity (master page last), heap appends are
//! durable when the OS says so. UPDATE and DELETE are parsed but stubbed.

pub mod btree;
pub mod cli;
pub mod config;
pub mod database;
pub mod schema;
pub mod sql;
pub mod storage;
pub mod vm;

pub use config::DbConfig;
pub use database::{Database, Execution};
