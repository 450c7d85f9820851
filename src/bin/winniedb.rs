//! # CLI Entry Point
//!
//! ```bash
//! # Open a database in the working directory
//! winniedb
//!
//! # Open a database directory
//! winniedb ./mydb
//! ```
//!
//! Storage-engine debug logging is enabled through `RUST_LOG`, e.g.
//! `RUST_LOG=winniedb=debug winniedb`.

use std::path::PathBuf;

use eyre::{bail, Result};
use tracing_subscriber::EnvFilter;
use winniedb::cli::Repl;
use winniedb::database::Database;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut dir = PathBuf::from(".");
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("winniedb {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
            path => dir = PathBuf::from(path),
        }
    }

    println!("WinnieDB started!");
    println!("Feel free to type in commands");

    let db = Database::open(&dir)?;
    Repl::new(db)?.run()
}

fn print_usage() {
    println!("Usage: winniedb [OPTIONS] [DIRECTORY]");
    println!();
    println!("Open (or create) the database files in DIRECTORY,");
    println!("defaulting to the current working directory.");
    println!();
    println!("Options:");
    println!("  -h, --help      Show this help");
    println!("  -v, --version   Show version");
}
