//! # Database Session
//!
//! One open database: the pager holding `index.db` for the session, the
//! in-memory catalog rebuilt from `tables.db` at startup, and the
//! statement pipeline (lex → parse → compile → run) the REPL drives.
//!
//! The session is strictly single-threaded and synchronous: one statement
//! runs to completion before the next is read. The heap files are opened
//! per operation by the VM; only the page file stays open here.

use std::path::Path;

use eyre::Result;
use tracing::debug;

use crate::config::DbConfig;
use crate::schema::{Catalog, TableDef};
use crate::sql::{Compiler, Parser};
use crate::storage::{HeapFile, Pager};
use crate::vm::Machine;

/// Result of one executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// SELECT output: one entry per matched row, fields in column order.
    Rows(Vec<Vec<String>>),
    /// Any other successful statement.
    Done,
}

pub struct Database {
    config: DbConfig,
    pager: Pager,
    catalog: Catalog,
}

impl Database {
    /// Opens the database in `dir`, creating the page file if absent and
    /// rebuilding the catalog from `tables.db`. Master-page corruption
    /// fails here, before any statement runs.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let config = DbConfig::new(dir);
        let pager = Pager::open(config.index_path())?;
        let catalog = Catalog::rebuild(&HeapFile::new(config.tables_path()))?;
        debug!(root = %config.root().display(), "database opened");
        Ok(Self {
            config,
            pager,
            catalog,
        })
    }

    /// Runs one statement line through the full pipeline.
    pub fn execute(&mut self, line: &str) -> Result<Execution> {
        let statement = Parser::new(line).parse_statement()?;
        let program = Compiler::new().compile(&statement)?;

        let rows = Machine::new(&mut self.pager, &mut self.catalog, &self.config).run(&program)?;
        if rows.is_empty() {
            Ok(Execution::Done)
        } else {
            Ok(Execution::Rows(rows.into_iter().map(|r| r.fields).collect()))
        }
    }

    /// Schema lookup for the `\d` meta-command.
    pub fn table_def(&self, name: &str) -> Option<&TableDef> {
        self.catalog.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.catalog.table_names()
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}
