//! # Catalog
//!
//! In-memory map of table name to schema, rebuilt at startup by walking
//! every frame of `tables.db` and kept in sync by the VM on DDL. The
//! catalog answers three questions during execution:
//!
//! 1. Does this table exist (duplicate CREATE TABLE, missing INSERT target)?
//! 2. Which position does a named column occupy in the row layout?
//! 3. Which columns are indexed, so INSERT knows to add B+tree entries?

use std::collections::HashMap;

use eyre::{ensure, Result};
use tracing::debug;

use super::persistence::decode_catalog_payload;
use super::table::TableDef;
use crate::storage::HeapFile;

#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, TableDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the catalog from the catalog file. A missing file is an
    /// empty catalog, which is how a fresh database starts.
    pub fn rebuild(tables_file: &HeapFile) -> Result<Self> {
        let mut catalog = Self::new();
        for (offset, payload) in tables_file.walk()? {
            let table = decode_catalog_payload(&payload)
                .map_err(|e| e.wrap_err(format!("corrupt catalog row at offset {}", offset)))?;
            debug!(table = %table.name, columns = table.columns.len(), "loaded catalog row");
            catalog.tables.insert(table.name.clone(), table);
        }
        Ok(catalog)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| eyre::eyre!("no table with that name: {}", name))
    }

    /// Registers a freshly created table. Duplicate names are refused
    /// before anything hits disk.
    pub fn insert(&mut self, table: TableDef) -> Result<()> {
        ensure!(
            !self.tables.contains_key(&table.name),
            "Table name already exists."
        );
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Flips the idx flag of the named columns. Unknown columns are the
    /// caller's error, checked before the on-disk patch happens.
    pub fn mark_indexed(&mut self, table: &str, columns: &[String]) -> Result<()> {
        let def = self
            .tables
            .get_mut(table)
            .ok_or_else(|| eyre::eyre!("no table with that name: {}", table))?;
        for name in columns {
            let col = def
                .columns
                .iter_mut()
                .find(|c| c.name == *name)
                .ok_or_else(|| eyre::eyre!("no column '{}' in table '{}'", name, table))?;
            col.index = true;
        }
        Ok(())
    }

    pub fn bump_row_count(&mut self, table: &str) {
        if let Some(def) = self.tables.get_mut(table) {
            def.row_count += 1;
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::persistence::encode_catalog_payload;
    use crate::schema::table::ColumnDef;
    use tempfile::tempdir;

    fn dogs() -> TableDef {
        TableDef::new(
            "dogs",
            vec![
                ColumnDef::new("name", "varchar"),
                ColumnDef::new("breed", "varchar"),
            ],
        )
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let mut catalog = Catalog::new();
        catalog.insert(dogs()).unwrap();
        let err = catalog.insert(dogs()).unwrap_err();
        assert_eq!(err.to_string(), "Table name already exists.");
    }

    #[test]
    fn mark_indexed_flips_flags_in_memory() {
        let mut catalog = Catalog::new();
        catalog.insert(dogs()).unwrap();
        catalog
            .mark_indexed("dogs", &["breed".to_string()])
            .unwrap();
        assert_eq!(
            catalog.get("dogs").unwrap().indexed_columns(),
            vec!["breed".to_string()]
        );
    }

    #[test]
    fn mark_indexed_rejects_unknown_column() {
        let mut catalog = Catalog::new();
        catalog.insert(dogs()).unwrap();
        assert!(catalog
            .mark_indexed("dogs", &["age".to_string()])
            .is_err());
    }

    #[test]
    fn rebuild_reads_every_catalog_frame() {
        let dir = tempdir().unwrap();
        let heap = HeapFile::new(dir.path().join("tables.db"));
        heap.append_frame(&encode_catalog_payload("dogs", &dogs().columns))
            .unwrap();
        heap.append_frame(&encode_catalog_payload(
            "coffee",
            &[ColumnDef::new("region", "varchar")],
        ))
        .unwrap();

        let catalog = Catalog::rebuild(&heap).unwrap();
        assert!(catalog.contains("dogs"));
        assert!(catalog.contains("coffee"));
        assert_eq!(catalog.table_names(), vec!["coffee", "dogs"]);
        assert_eq!(catalog.get("dogs").unwrap().columns.len(), 2);
    }

    #[test]
    fn rebuild_of_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let heap = HeapFile::new(dir.path().join("tables.db"));
        let catalog = Catalog::rebuild(&heap).unwrap();
        assert!(catalog.table_names().is_empty());
    }
}
