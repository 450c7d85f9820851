//! # Virtual Machine
//!
//! Stack interpreter for compiled statements. The instruction pointer
//! walks the byte stream; each opcode reads its big-endian operands and
//! either pushes a constant-derived object or consumes part of the stack
//! to produce a durable effect.
//!
//! ## Execution States
//!
//! A statement passes through three states: *loading* (dispatch on
//! opcode), *stack drain* (after `Select`, matched rows remain on the
//! stack), and *terminal* (instruction pointer past the end). There are no
//! jumps or calls; control flow is strictly linear.
//!
//! ## Effect Ordering
//!
//! Within one statement: operands are encoded first, the data file append
//! happens second, catalog and B+tree updates come last. There is no
//! write-ahead log; a statement interrupted between those steps leaves
//! its earlier effects durable. Across statements execution is strictly
//! sequential, so every SELECT observes all committed prior statements.
//!
//! ## The Three-File Contract
//!
//! - `tables.db` gains one frame per CREATE TABLE; the B+tree maps the
//!   table name to that frame's offset.
//! - `rows.db` gains one frame per INSERT; for every indexed column the
//!   B+tree maps the column value to the frame's offset.
//! - CREATE INDEX patches flag bytes inside an existing catalog frame and
//!   backfills tree entries for rows already on disk.

use eyre::{bail, ensure, Result};
use tracing::debug;

use crate::config::{DbConfig, FRAME_HEADER_SIZE, VM_STACK_SIZE};
use crate::schema::persistence::{decode_catalog_payload, idx_flag_offset, row_count_offset};
use crate::schema::{Catalog, TableDef};
use crate::sql::Program;
use crate::storage::{HeapFile, Pager};
use crate::vm::encoding::{decode_row, encode_string, Field, BOOL_TRUE};
use crate::vm::object::{FoundRow, Obj, TableInfo};
use crate::vm::opcode::{read_operand, Opcode};

/// Executes one compiled statement against the shared session state.
pub struct Machine<'a> {
    pager: &'a mut Pager,
    catalog: &'a mut Catalog,
    tables: HeapFile,
    rows: HeapFile,
    stack: Vec<Obj>,
}

impl<'a> Machine<'a> {
    pub fn new(pager: &'a mut Pager, catalog: &'a mut Catalog, config: &DbConfig) -> Self {
        Self {
            pager,
            catalog,
            tables: HeapFile::new(config.tables_path()),
            rows: HeapFile::new(config.rows_path()),
            stack: Vec::new(),
        }
    }

    /// Runs the program to completion and returns the matched rows of a
    /// SELECT (empty for every other statement), in scan order.
    pub fn run(&mut self, program: &Program) -> Result<Vec<FoundRow>> {
        let ins = &program.instructions;
        let mut ip = 0usize;

        while ip < ins.len() {
            let op = Opcode::from_byte(ins[ip])?;
            ip += 1;

            let widths = op.operand_widths();
            let mut operands = [0usize; 2];
            for (i, width) in widths.iter().enumerate() {
                operands[i] = read_operand(ins, ip, *width)?;
                ip += width;
            }

            match op {
                Opcode::Constant => {
                    let obj = self.constant(program, operands[0])?.clone();
                    self.push(obj)?;
                }
                Opcode::EncodeStringVal | Opcode::EncodeTableCell => {
                    let obj = self.constant(program, operands[0])?;
                    let Some(encoded) = obj.encode() else {
                        bail!("constant {} has no byte encoding", obj);
                    };
                    self.push(Obj::EncodedVal(encoded))?;
                }
                Opcode::TableNameSearch => {
                    let obj = self.constant(program, operands[0])?.clone();
                    ensure!(
                        matches!(obj, Obj::TableName(_)),
                        "constant {} is not a table name",
                        obj
                    );
                    self.push(obj)?;
                }
                Opcode::WhereCondition => {
                    let obj = self.constant(program, operands[0])?.clone();
                    ensure!(
                        matches!(obj, Obj::Where(_)),
                        "constant {} is not a where clause",
                        obj
                    );
                    self.push(obj)?;
                }
                Opcode::CreateTable => self.op_create_table(operands[0])?,
                Opcode::CreateTableIndex => {
                    let name = self.table_name_constant(program, operands[0])?;
                    self.op_create_index(&name)?;
                }
                Opcode::Select => self.op_select(operands[0])?,
                Opcode::InsertRow => self.op_insert_row(operands[0])?,
                Opcode::TableInfo => {
                    let name = self.table_name_constant(program, operands[0])?;
                    self.op_table_info(&name)?;
                }
                Opcode::ColInfo => {
                    let col = self.col_constant(program, operands[0])?;
                    self.op_col_info(&col)?;
                }
                Opcode::ValInfo => {
                    let val = self.col_constant(program, operands[0])?;
                    self.op_val_info(&val)?;
                }
                Opcode::Insert => self.op_insert_finalize()?,
            }
        }

        self.drain_found_rows()
    }

    // ---- stack ----

    fn push(&mut self, obj: Obj) -> Result<()> {
        ensure!(self.stack.len() < VM_STACK_SIZE, "stack overflow");
        self.stack.push(obj);
        Ok(())
    }

    fn pop(&mut self) -> Result<Obj> {
        self.stack
            .pop()
            .ok_or_else(|| eyre::eyre!("pop from an empty stack"))
    }

    fn pop_encoded(&mut self) -> Result<Vec<u8>> {
        match self.pop()? {
            Obj::EncodedVal(bytes) => Ok(bytes),
            other => bail!("type mismatch on pop: expected encoded value, found {}", other.kind()),
        }
    }

    fn drain_found_rows(&mut self) -> Result<Vec<FoundRow>> {
        let mut rows = Vec::new();
        while let Some(obj) = self.stack.pop() {
            match obj {
                Obj::FoundRow(row) => rows.push(row),
                other => bail!("operand left on stack after execution: {}", other.kind()),
            }
        }
        rows.reverse(); // pops yielded newest-first; report in scan order
        Ok(rows)
    }

    // ---- constants ----

    fn constant<'p>(&self, program: &'p Program, idx: usize) -> Result<&'p Obj> {
        program
            .constants
            .get(idx)
            .ok_or_else(|| eyre::eyre!("constant index {} out of range", idx))
    }

    fn table_name_constant(&self, program: &Program, idx: usize) -> Result<String> {
        match self.constant(program, idx)? {
            Obj::TableName(name) => Ok(name.clone()),
            other => bail!("constant {} is not a table name", other),
        }
    }

    fn col_constant(&self, program: &Program, idx: usize) -> Result<String> {
        match self.constant(program, idx)? {
            Obj::Col(value) => Ok(value.clone()),
            other => bail!("constant {} is not a column value", other),
        }
    }

    // ---- index plumbing ----

    fn index_put(&mut self, key: &str, offset: u32) -> Result<()> {
        self.pager.set(key.as_bytes(), &offset.to_le_bytes())
    }

    fn index_get(&self, key: &str) -> Option<u32> {
        self.pager
            .get(key.as_bytes())
            .filter(|v| v.len() == 4)
            .map(|v| u32::from_le_bytes(v[..4].try_into().unwrap()))
    }

    // ---- handlers ----

    /// Pops the encoded table name and column cells, frames them with a
    /// zero row count, and records the catalog row in all three places:
    /// `tables.db`, the B+tree, and the in-memory catalog.
    fn op_create_table(&mut self, n: usize) -> Result<()> {
        let mut payload = Vec::new();
        for _ in 0..n {
            let encoded = self.pop_encoded()?;
            // LIFO order: prepend so the table name ends up first.
            payload.splice(0..0, encoded);
        }
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]);

        let table = decode_catalog_payload(&payload)?;
        ensure!(!self.catalog.contains(&table.name), "Table name already exists.");

        let offset = self.tables.append_frame(&payload)?;
        self.index_put(&table.name.clone(), offset)?;
        debug!(table = %table.name, offset, "created table");
        self.catalog.insert(table)
    }

    /// Patches the idx flag byte of each popped column inside the catalog
    /// frame, then backfills tree entries for every existing row.
    fn op_create_index(&mut self, table: &str) -> Result<()> {
        let mut columns = Vec::new();
        while let Some(Obj::Col(_)) = self.stack.last() {
            match self.pop()? {
                Obj::Col(name) => columns.push(name),
                _ => unreachable!(),
            }
        }
        columns.reverse();

        let Some(table_offset) = self.index_get(table) else {
            bail!("no table with that name: {}", table);
        };
        let payload = self.tables.read_frame_at(table_offset)?;

        // Resolve every flag offset before touching the file so an unknown
        // column leaves the row unpatched.
        let mut flag_offsets = Vec::with_capacity(columns.len());
        for column in &columns {
            flag_offsets.push(idx_flag_offset(&payload, column)?);
        }
        for flag_offset in flag_offsets {
            self.tables.patch_at(
                table_offset as u64 + FRAME_HEADER_SIZE as u64 + flag_offset as u64,
                &[BOOL_TRUE],
            )?;
        }
        self.catalog.mark_indexed(table, &columns)?;

        let row_count = decode_catalog_payload(&payload)?.row_count;
        debug!(table, ?columns, row_count, "marked columns indexed");
        if row_count > 0 {
            self.backfill_index(table, &columns)?;
        }
        Ok(())
    }

    /// Walks `rows.db` and inserts one tree entry per indexed value of
    /// every row belonging to `table`.
    fn backfill_index(&mut self, table: &str, columns: &[String]) -> Result<()> {
        let def = self.catalog.resolve(table)?.clone();
        let mut positions = Vec::with_capacity(columns.len());
        for column in columns {
            let pos = def
                .column_position(column)
                .ok_or_else(|| eyre::eyre!("no column '{}' in table '{}'", column, table))?;
            positions.push(pos);
        }

        for (frame_offset, payload) in self.rows.walk()? {
            let (name, fields) = decode_row(&payload)?;
            if name != table {
                continue;
            }
            for &pos in &positions {
                if let Some(Field::Str(value)) = fields.get(pos) {
                    self.index_put(value.as_str(), frame_offset)?;
                }
            }
        }
        Ok(())
    }

    /// Pops the encoded table name and values, frames them, and appends to
    /// `rows.db`; then bumps the row count and adds index entries.
    fn op_insert_row(&mut self, n: usize) -> Result<()> {
        let mut payload = Vec::new();
        for _ in 0..n {
            let encoded = self.pop_encoded()?;
            payload.splice(0..0, encoded);
        }
        self.write_row(payload)
    }

    fn write_row(&mut self, payload: Vec<u8>) -> Result<()> {
        let (name, fields) = decode_row(&payload)?;
        let def = self.catalog.resolve(&name)?.clone();
        ensure!(
            fields.len() <= def.columns.len(),
            "Too many values for table"
        );

        let offset = self.rows.append_frame(&payload)?;
        self.bump_row_count(&name)?;

        for column in def.indexed_columns() {
            let pos = def.column_position(&column).expect("indexed column exists");
            if let Some(Field::Str(value)) = fields.get(pos) {
                self.index_put(value.as_str(), offset)?;
            }
        }

        debug!(table = %name, offset, "inserted row");
        Ok(())
    }

    /// Same-length patch of the catalog row's trailing count field.
    fn bump_row_count(&mut self, table: &str) -> Result<()> {
        let Some(table_offset) = self.index_get(table) else {
            bail!("no table with that name: {}", table);
        };
        let payload = self.tables.read_frame_at(table_offset)?;
        let count_offset = row_count_offset(&payload);
        let count = u32::from_le_bytes(payload[count_offset..count_offset + 4].try_into().unwrap());

        self.tables.patch_at(
            table_offset as u64 + FRAME_HEADER_SIZE as u64 + count_offset as u64,
            &(count + 1).to_le_bytes(),
        )?;
        self.catalog.bump_row_count(table);
        Ok(())
    }

    /// Builds the column-qualified INSERT state: every slot NULL until the
    /// ColInfo/ValInfo pairs fill it in.
    fn op_table_info(&mut self, table: &str) -> Result<()> {
        let def = self.catalog.resolve(table)?;
        let cells = def
            .columns
            .iter()
            .map(|c| crate::vm::object::ColCell {
                name: c.name.clone(),
                col_type: c.col_type.clone(),
                index: c.index,
                unique: c.unique,
                pk: c.pk,
            })
            .collect();
        self.push(Obj::TableInfo(TableInfo::new(table, cells)))
    }

    fn table_info_mut(&mut self) -> Result<&mut TableInfo> {
        match self.stack.last_mut() {
            Some(Obj::TableInfo(info)) => Ok(info),
            Some(other) => bail!(
                "type mismatch on stack: expected table info, found {}",
                other.kind()
            ),
            None => bail!("pop from an empty stack"),
        }
    }

    /// Marks the named column's position with the next column counter.
    fn op_col_info(&mut self, column: &str) -> Result<()> {
        let info = self.table_info_mut()?;
        let Some(position) = info.cols.iter().position(|c| c.name == column) else {
            bail!("no column '{}' in table '{}'", column, info.name);
        };
        info.col_counter += 1;
        info.marker[position] = info.col_counter;
        Ok(())
    }

    /// Deposits the encoded value at the position whose marker matches the
    /// next value counter, the inverse of the ColInfo mapping.
    fn op_val_info(&mut self, value: &str) -> Result<()> {
        let encoded = encode_string(value);
        let info = self.table_info_mut()?;
        info.val_counter += 1;
        let target = info.val_counter;
        let Some(position) = info.marker.iter().position(|&m| m == target) else {
            bail!("value {} has no matching column marker", target);
        };
        info.pending[position] = encoded;
        Ok(())
    }

    /// Concatenates the table name and pending slots into a row payload
    /// and runs the common insert path.
    fn op_insert_finalize(&mut self) -> Result<()> {
        let info = match self.pop()? {
            Obj::TableInfo(info) => info,
            other => bail!(
                "type mismatch on pop: expected table info, found {}",
                other.kind()
            ),
        };

        let mut payload = encode_string(&info.name);
        for slot in &info.pending {
            payload.extend_from_slice(slot);
        }
        self.write_row(payload)
    }

    /// Pops the table name and predicates, scans `rows.db`, and pushes one
    /// `FoundRow` per matching row.
    fn op_select(&mut self, n: usize) -> Result<()> {
        let mut table: Option<String> = None;
        let mut predicates = Vec::new();
        for _ in 0..n {
            match self.pop()? {
                Obj::TableName(name) => table = Some(name),
                Obj::Where(w) => predicates.push(w),
                other => bail!(
                    "type mismatch on pop: expected table name or where clause, found {}",
                    other.kind()
                ),
            }
        }
        let Some(table) = table else {
            bail!("SELECT without a table name operand");
        };

        let def = self.catalog.resolve(&table)?.clone();
        let targets = self.predicate_positions(&def, &predicates)?;

        let mut matches = Vec::new();
        for (_, payload) in self.rows.walk()? {
            let (name, fields) = decode_row(&payload)?;
            if name != table {
                continue;
            }
            if row_matches(&fields, &targets) {
                matches.push(FoundRow {
                    fields: fields.iter().map(Field::display).collect(),
                });
            }
        }

        debug!(table = %table, rows = matches.len(), "select scan finished");
        for row in matches {
            self.push(Obj::FoundRow(row))?;
        }
        Ok(())
    }

    fn predicate_positions(
        &self,
        def: &TableDef,
        predicates: &[crate::vm::object::Where],
    ) -> Result<Vec<(usize, String)>> {
        predicates
            .iter()
            .map(|w| {
                def.column_position(&w.column)
                    .map(|pos| (pos, w.value.clone()))
                    .ok_or_else(|| {
                        eyre::eyre!("no column '{}' in table '{}'", w.column, def.name)
                    })
            })
            .collect()
    }
}

/// A row matches when every predicate position holds exactly the wanted
/// string. NULL slots match nothing.
fn row_matches(fields: &[Field], targets: &[(usize, String)]) -> bool {
    targets.iter().all(|(pos, wanted)| {
        matches!(fields.get(*pos), Some(Field::Str(actual)) if actual == wanted)
    })
}
