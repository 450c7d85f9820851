//! # Bytecode Compiler
//!
//! Walks one statement and emits an instruction stream plus its constant
//! pool. Compilation is a straight transcription: the dialect has no
//! expressions to fold and no plans to choose between, so each statement
//! kind maps to a fixed emission shape:
//!
//! ```text
//! CREATE TABLE t (a x, b y)     EncodeStringVal t
//!                               EncodeTableCell (a x --- )
//!                               EncodeTableCell (b y --- )
//!                               CreateTable 3
//!
//! CREATE INDEX ON t (a, b)      Constant a
//!                               Constant b
//!                               CreateTableIndex t
//!
//! INSERT INTO t VALUES (..)     EncodeStringVal t
//!                               EncodeStringVal v1 ... vn
//!                               InsertRow n+1
//!
//! INSERT INTO t (cols) VALUES   TableInfo t
//!                               ColInfo c1 ... ColInfo cn
//!                               ValInfo v1 ... ValInfo vn
//!                               Insert
//!
//! SELECT * FROM t WHERE ...     TableNameSearch t
//!                               WhereCondition p1 ... pk
//!                               Select k+1
//! ```
//!
//! UPDATE and DELETE are recognised by the parser but have no opcodes;
//! they stop here with a stub message.

use eyre::{bail, ensure, Result};

use super::ast::{Statement, Value};
use crate::vm::object::{ColCell, Obj, Where};
use crate::vm::opcode::{make, Instructions, Opcode};

/// A compiled statement: the instruction stream and its constant pool.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Instructions,
    pub constants: Vec<Obj>,
}

#[derive(Debug, Default)]
pub struct Compiler {
    instructions: Instructions,
    constants: Vec<Obj>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(mut self, statement: &Statement) -> Result<Program> {
        match statement {
            Statement::CreateTable(stmt) => {
                let name = self.add_constant(Obj::TableName(stmt.name.clone()));
                self.emit(Opcode::EncodeStringVal, &[name]);

                for (col, col_type) in &stmt.columns {
                    let cell = self.add_constant(Obj::ColCell(ColCell::new(col, col_type)));
                    self.emit(Opcode::EncodeTableCell, &[cell]);
                }

                let count = self.operand_count(1 + stmt.columns.len())?;
                self.emit(Opcode::CreateTable, &[count]);
            }
            Statement::CreateIndex(stmt) => {
                for col in &stmt.columns {
                    let k = self.add_constant(Obj::Col(col.clone()));
                    self.emit(Opcode::Constant, &[k]);
                }
                let table = self.add_constant(Obj::TableName(stmt.table.clone()));
                self.emit(Opcode::CreateTableIndex, &[table]);
            }
            Statement::Insert(stmt) => match &stmt.columns {
                None => {
                    let name = self.add_constant(Obj::TableName(stmt.table.clone()));
                    self.emit(Opcode::EncodeStringVal, &[name]);

                    for value in &stmt.values {
                        let Value::Str(s) = value;
                        let k = self.add_constant(Obj::Col(s.clone()));
                        self.emit(Opcode::EncodeStringVal, &[k]);
                    }

                    let count = self.operand_count(1 + stmt.values.len())?;
                    self.emit(Opcode::InsertRow, &[count]);
                }
                Some(columns) => {
                    let name = self.add_constant(Obj::TableName(stmt.table.clone()));
                    self.emit(Opcode::TableInfo, &[name]);

                    for col in columns {
                        let k = self.add_constant(Obj::Col(col.clone()));
                        self.emit(Opcode::ColInfo, &[k]);
                    }
                    for value in &stmt.values {
                        let Value::Str(s) = value;
                        let k = self.add_constant(Obj::Col(s.clone()));
                        self.emit(Opcode::ValInfo, &[k]);
                    }
                    self.emit(Opcode::Insert, &[]);
                }
            },
            Statement::Select(stmt) => {
                let table = self.add_constant(Obj::TableName(stmt.table.clone()));
                self.emit(Opcode::TableNameSearch, &[table]);

                for predicate in &stmt.predicates {
                    let k = self.add_constant(Obj::Where(Where {
                        column: predicate.column.clone(),
                        value: predicate.value.clone(),
                    }));
                    self.emit(Opcode::WhereCondition, &[k]);
                }

                let count = self.operand_count(1 + stmt.predicates.len())?;
                self.emit(Opcode::Select, &[count]);
            }
            Statement::Update { .. } => bail!("UPDATE is not implemented yet"),
            Statement::Delete { .. } => bail!("DELETE is not implemented yet"),
        }

        Ok(Program {
            instructions: self.instructions,
            constants: self.constants,
        })
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) {
        let ins = make(op, operands);
        self.instructions.extend_from_slice(&ins);
    }

    fn add_constant(&mut self, obj: Obj) -> usize {
        self.constants.push(obj);
        self.constants.len() - 1
    }

    /// Stack-consuming ops carry their operand count in one byte.
    fn operand_count(&self, n: usize) -> Result<usize> {
        ensure!(n <= u8::MAX as usize, "too many operands in one statement: {}", n);
        Ok(n)
    }
}
