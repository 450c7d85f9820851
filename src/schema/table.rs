//! # Table Definitions
//!
//! In-memory shape of one table: ordered columns with their declared type
//! and the three flag bits, plus the last known row count. The on-disk
//! source of truth is the table's catalog row in `tables.db`; these
//! structs are what the VM consults between statements.

/// One column: name, declared type, and the catalog flag bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: String,
    pub index: bool,
    pub unique: bool,
    pub pk: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            col_type: col_type.into(),
            index: false,
            unique: false,
            pk: false,
        }
    }
}

/// One table's schema as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub row_count: u32,
}

impl TableDef {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            row_count: 0,
        }
    }

    /// Positional index of a column within the row layout.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the columns whose idx flag is set, in column order.
    pub fn indexed_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.index)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn has_indexed_column(&self) -> bool {
        self.columns.iter().any(|c| c.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn column_positions_follow_declaration_order() {
        let table = dogs();
        assert_eq!(table.column_position("name"), Some(0));
        assert_eq!(table.column_position("breed"), Some(1));
        assert_eq!(table.column_position("age"), None);
    }

    #[test]
    fn indexed_columns_track_flags() {
        let mut table = dogs();
        assert!(!table.has_indexed_column());
        assert!(table.indexed_columns().is_empty());

        table.columns[1].index = true;
        assert!(table.has_indexed_column());
        assert_eq!(table.indexed_columns(), vec!["breed".to_string()]);
    }
}
