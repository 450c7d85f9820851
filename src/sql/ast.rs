//! # Statement AST
//!
//! One parsed statement per line. The dialect has no expressions beyond
//! equality against a string literal, so the tree is shallow: statement
//! structs holding identifier and literal lists.

/// A literal value in an INSERT values list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStatement {
    pub name: String,
    /// `(column name, declared type)` in source order.
    pub columns: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStatement {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    /// Column list of a column-qualified insert; `None` for positional.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Value>,
}

/// `column = "literal"`; conjuncts of the WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub table: String,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    CreateIndex(CreateIndexStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
    /// Recognised but unimplemented; execution reports the stub.
    Update { table: String },
    /// Recognised but unimplemented; execution reports the stub.
    Delete { table: String },
}
