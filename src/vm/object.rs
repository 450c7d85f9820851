//! # Operand Objects
//!
//! The tagged values the VM's operand stack carries. Compiled programs
//! reference them through the constant pool; handlers push and pop them
//! while executing a statement.
//!
//! Most variants are small carriers (a table name, a predicate). The
//! exception is [`TableInfo`], the builder for column-qualified INSERT: it
//! accumulates encoded values into positional slots before the final
//! `OpInsert` writes the row.

use std::fmt;

use crate::vm::encoding::{encode_bool, encode_string, encode_string_into, NULL_FIELD};

/// A column cell of a catalog row: name, declared type, and the three
/// flag bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColCell {
    pub name: String,
    pub col_type: String,
    pub index: bool,
    pub unique: bool,
    pub pk: bool,
}

impl ColCell {
    pub fn new(name: impl Into<String>, col_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            col_type: col_type.into(),
            index: false,
            unique: false,
            pk: false,
        }
    }

    /// On-disk cell encoding: `name\0 type\0 idx uniq pk`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.name.len() + self.col_type.len() + 5);
        encode_string_into(&mut out, &self.name);
        encode_string_into(&mut out, &self.col_type);
        out.push(encode_bool(self.index));
        out.push(encode_bool(self.unique));
        out.push(encode_bool(self.pk));
        out
    }
}

/// An equality predicate from a WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Where {
    pub column: String,
    pub value: String,
}

/// Builder state for a column-qualified INSERT.
///
/// `pending` holds one encoded slot per table column, pre-filled with the
/// NULL sentinel. `OpColInfo` stamps `marker[position]` with an increasing
/// counter; `OpValInfo` later deposits the matching value by finding the
/// position whose marker equals its own counter. The two counters make the
/// column list and the value list meet without the compiler having to pair
/// them up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub cols: Vec<ColCell>,
    pub marker: Vec<usize>,
    pub pending: Vec<Vec<u8>>,
    pub col_counter: usize,
    pub val_counter: usize,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, cols: Vec<ColCell>) -> Self {
        let n = cols.len();
        Self {
            name: name.into(),
            cols,
            marker: vec![0; n],
            pending: vec![vec![NULL_FIELD]; n],
            col_counter: 0,
            val_counter: 0,
        }
    }
}

/// One matched row of a SELECT, ready for printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundRow {
    pub fields: Vec<String>,
}

/// The operand sum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obj {
    TableName(String),
    Col(String),
    ColCell(ColCell),
    Where(Where),
    EncodedVal(Vec<u8>),
    FoundRow(FoundRow),
    RowOffset(u32),
    TableInfo(TableInfo),
}

impl Obj {
    /// Short tag for type-mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Obj::TableName(_) => "table name",
            Obj::Col(_) => "column",
            Obj::ColCell(_) => "column cell",
            Obj::Where(_) => "where clause",
            Obj::EncodedVal(_) => "encoded value",
            Obj::FoundRow(_) => "found row",
            Obj::RowOffset(_) => "row offset",
            Obj::TableInfo(_) => "table info",
        }
    }

    /// Serializes the constant-pool objects that can appear in a row
    /// payload. Stack-only carriers have no byte form.
    pub fn encode(&self) -> Option<Vec<u8>> {
        match self {
            Obj::TableName(s) | Obj::Col(s) => Some(encode_string(s)),
            Obj::ColCell(cell) => Some(cell.encode()),
            Obj::EncodedVal(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obj::TableName(s) => write!(f, "TableName({})", s),
            Obj::Col(s) => write!(f, "Col({})", s),
            Obj::ColCell(c) => write!(f, "ColCell({} {})", c.name, c.col_type),
            Obj::Where(w) => write!(f, "Where({} = {})", w.column, w.value),
            Obj::EncodedVal(b) => write!(f, "EncodedVal({} bytes)", b.len()),
            Obj::FoundRow(r) => write!(f, "FoundRow[{}]", r.fields.join(" ")),
            Obj::RowOffset(o) => write!(f, "RowOffset({})", o),
            Obj::TableInfo(t) => write!(f, "TableInfo({})", t.name),
        }
    }
}
