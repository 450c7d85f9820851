//! # REPL
//!
//! The interactive loop: read a line with rustyline, dispatch
//! meta-commands, require the `;` terminator, and drive one statement
//! through the database per line.
//!
//! ## Surface
//!
//! ```text
//! >>> CREATE TABLE dogs (name varchar, breed varchar);
//! >>> Executed.
//! >>> INSERT INTO dogs VALUES ("winnie", "cane corso");
//! >>> Executed.
//! >>> SELECT * FROM dogs WHERE breed = "cane corso";
//! >>> [winnie cane corso]
//! >>> Executed.
//! >>> SELECT * FROM dogs
//! Missing ';'
//! >>> \q
//! ```
//!
//! Statements are single-line: a line without the terminator is refused
//! rather than accumulated. Errors are printed and the loop continues;
//! only `\q`, Ctrl+D, or a read failure end the session.

use eyre::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::commands::{self, MetaResult};
use super::history::history_path;
use crate::database::{Database, Execution};

const PROMPT: &str = ">>> ";

pub struct Repl {
    db: Database,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(db: Database) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        if let Some(history) = history_path() {
            let _ = editor.load_history(&history);
        }
        Ok(Self { db, editor })
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if !self.handle_line(&line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    eprintln!("Error reading input: {}", err);
                    break;
                }
            }
        }
        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        if let Some(history) = history_path() {
            if let Err(e) = self.editor.save_history(&history) {
                eprintln!("Warning: could not save history: {}", e);
            }
        }
    }

    /// Returns `false` when the session should end.
    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        self.editor.add_history_entry(trimmed).ok();

        if commands::is_meta(trimmed) {
            return match commands::execute(trimmed, &self.db) {
                MetaResult::Exit => {
                    println!(">>> Shutting down...");
                    false
                }
                MetaResult::Output(text) => {
                    println!("{}", text);
                    true
                }
            };
        }

        if !trimmed.ends_with(';') {
            println!("Missing ';'");
            return true;
        }

        match self.db.execute(trimmed) {
            Ok(Execution::Rows(rows)) => {
                for row in rows {
                    println!(">>> [{}]", row.join(" "));
                }
                println!(">>> Executed.");
            }
            Ok(Execution::Done) => {
                println!(">>> Executed.");
            }
            Err(err) => {
                println!("{}", err);
            }
        }
        true
    }
}
