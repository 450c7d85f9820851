//! # Meta-Command Handler
//!
//! Backslash commands the REPL executes without touching the SQL
//! pipeline:
//!
//! | Command      | Description                             |
//! |--------------|-----------------------------------------|
//! | `\q`         | Exit with status 0                      |
//! | `\d <table>` | Pretty-print the table's columns/indexes|
//!
//! Anything else starting with `\` reports the unknown-command line the
//! prompt documents.

use crate::database::Database;

#[derive(Debug, PartialEq, Eq)]
pub enum MetaResult {
    Exit,
    Output(String),
}

pub fn is_meta(input: &str) -> bool {
    input.starts_with('\\')
}

pub fn execute(input: &str, db: &Database) -> MetaResult {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or("");

    match command {
        "\\q" => MetaResult::Exit,
        "\\d" => match parts.next() {
            Some(table) => MetaResult::Output(describe_table(db, table)),
            None => MetaResult::Output(list_tables(db)),
        },
        _ => MetaResult::Output(format!(">>> Unknown meta command: {}", input)),
    }
}

fn describe_table(db: &Database, name: &str) -> String {
    let Some(def) = db.table_def(name) else {
        return format!("no table with that name: {}", name);
    };

    let mut out = format!("Table \"{}\" ({} rows)\n", def.name, def.row_count);
    for col in &def.columns {
        out.push_str(&format!("  {} {}", col.name, col.col_type));
        if col.index {
            out.push_str(" [indexed]");
        }
        if col.unique {
            out.push_str(" [unique]");
        }
        if col.pk {
            out.push_str(" [pk]");
        }
        out.push('\n');
    }

    let indexed = def.indexed_columns();
    if indexed.is_empty() {
        out.push_str("Indexes: none");
    } else {
        out.push_str(&format!("Indexes: {}", indexed.join(", ")));
    }
    out
}

fn list_tables(db: &Database) -> String {
    let names = db.table_names();
    if names.is_empty() {
        "no tables".to_string()
    } else {
        names.join("\n")
    }
}
