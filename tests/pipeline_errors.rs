//! # Error Paths Through the Statement Pipeline
//!
//! A rejected statement must be exactly that: rejected. The session keeps
//! running, earlier durable state stays intact, and the next statement
//! executes normally. These tests drive bad input through the database
//! and then prove the session is still healthy.
//!
//! ## Requirements Tested
//!
//! - R1: parse errors skip the statement without touching any file
//! - R2: catalog errors (unknown table/column, duplicates) skip the
//!   statement; prior tables remain queryable
//! - R3: error messages carry the information the prompt needs (counts in
//!   arity mismatches, names in unknown-identifier errors)

use tempfile::tempdir;
use winniedb::config::DbConfig;
use winniedb::database::{Database, Execution};

mod parse_errors {
    use super::*;

    #[test]
    fn garbage_statement_is_rejected() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        assert!(db.execute("FROBNICATE the database;").is_err());
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        assert!(db.execute("SELECT * FROM dogs").is_err());
    }

    #[test]
    fn single_quoted_strings_are_not_the_dialect() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE dogs (name varchar);").unwrap();
        assert!(db.execute("INSERT INTO dogs VALUES ('winnie');").is_err());
    }

    #[test]
    fn parse_error_leaves_no_files_behind() {
        let dir = tempdir().unwrap();
        let config = DbConfig::new(dir.path());
        let mut db = Database::open(dir.path()).unwrap();

        assert!(db.execute("CREATE TABLE (name varchar);").is_err());

        assert!(!config.tables_path().exists());
        assert!(!config.rows_path().exists());
    }

    #[test]
    fn arity_mismatch_reports_both_counts() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE t (a varchar, b varchar, c varchar);")
            .unwrap();

        let err = db
            .execute("INSERT INTO t (a, b, c) VALUES (\"1\", \"2\");")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains('3') && msg.contains('2'), "got: {}", msg);
    }
}

mod catalog_errors {
    use super::*;

    #[test]
    fn unknown_insert_target_is_named_in_the_error() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        let err = db
            .execute("INSERT INTO ghosts VALUES (\"boo\");")
            .unwrap_err();
        assert!(err.to_string().contains("ghosts"));
    }

    #[test]
    fn unknown_index_target_patches_nothing() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        assert!(db.execute("CREATE INDEX ON ghosts (name);").is_err());
    }

    #[test]
    fn session_continues_after_errors() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE dogs (name varchar);").unwrap();

        assert!(db.execute("CREATE TABLE dogs (name varchar);").is_err());
        assert!(db.execute("SELECT * FROM cats;").is_err());
        assert!(db.execute("INSERT INTO dogs VALUES (\"a\", \"b\");").is_err());

        db.execute("INSERT INTO dogs VALUES (\"winnie\");").unwrap();
        assert_eq!(
            db.execute("SELECT * FROM dogs WHERE name = \"winnie\";")
                .unwrap(),
            Execution::Rows(vec![vec!["winnie".to_string()]])
        );
    }

    #[test]
    fn failed_insert_does_not_bump_the_count() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(dir.path()).unwrap();
        db.execute("CREATE TABLE dogs (name varchar);").unwrap();
        db.execute("INSERT INTO dogs VALUES (\"winnie\");").unwrap();

        assert!(db.execute("INSERT INTO dogs VALUES (\"a\", \"b\");").is_err());
        assert_eq!(db.table_def("dogs").unwrap().row_count, 1);
    }
}

mod startup_errors {
    use super::*;

    #[test]
    fn corrupt_master_page_aborts_open() {
        let dir = tempdir().unwrap();
        let config = DbConfig::new(dir.path());
        {
            let mut db = Database::open(dir.path()).unwrap();
            db.execute("CREATE TABLE dogs (name varchar);").unwrap();
        }

        // Stomp the signature.
        let mut raw = std::fs::read(config.index_path()).unwrap();
        raw[..6].copy_from_slice(b"broken");
        std::fs::write(config.index_path(), raw).unwrap();

        assert!(Database::open(dir.path()).is_err());
    }

    #[test]
    fn corrupt_catalog_frame_aborts_open() {
        let dir = tempdir().unwrap();
        let config = DbConfig::new(dir.path());
        {
            let mut db = Database::open(dir.path()).unwrap();
            db.execute("CREATE TABLE dogs (name varchar);").unwrap();
        }

        // Truncate mid-frame: the rebuild walk must notice.
        let raw = std::fs::read(config.tables_path()).unwrap();
        std::fs::write(config.tables_path(), &raw[..raw.len() - 3]).unwrap();

        assert!(Database::open(dir.path()).is_err());
    }
}
