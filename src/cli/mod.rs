//! # CLI Module
//!
//! The interactive surface: the rustyline [`repl`] loop and the
//! backslash [`commands`] it dispatches.

pub mod commands;
pub mod history;
pub mod repl;

pub use repl::Repl;
