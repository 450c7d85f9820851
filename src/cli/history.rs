//! # REPL History
//!
//! Command history persists across sessions in the user's home directory,
//! falling back to the working directory when no home is known. History
//! failures are never fatal; a REPL without history is still a REPL.

use std::path::PathBuf;

const HISTORY_FILE: &str = ".winniedb_history";

/// Location of the history file, if one can be determined.
pub fn history_path() -> Option<PathBuf> {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())?;
    Some(base.join(HISTORY_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_path_ends_with_file_name() {
        if let Some(path) = history_path() {
            assert!(path.ends_with(HISTORY_FILE));
        }
    }
}
