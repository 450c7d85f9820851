//! # Virtual Machine Module
//!
//! The execution half of the system: the operand [`object`] model, the
//! [`opcode`] table, the field [`encoding`] shared with the on-disk row
//! formats, and the [`machine`] that interprets compiled statements
//! against the pager, catalog, and heap files.

pub mod encoding;
pub mod machine;
pub mod object;
pub mod opcode;

pub use machine::Machine;
pub use object::{FoundRow, Obj};
pub use opcode::{Instructions, Opcode};
