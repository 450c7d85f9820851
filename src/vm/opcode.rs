//! # Opcode Definitions
//!
//! A compiled program is a flat byte stream: an opcode byte followed by
//! that opcode's operands, big-endian, with widths declared in the
//! definition table below. Constants live in a parallel pool addressed by
//! `u16` operands; the small count operands of the stack-consuming ops fit
//! in one byte.
//!
//! | Op                  | Operands | Meaning                                        |
//! |---------------------|----------|------------------------------------------------|
//! | `Constant`          | (2)      | push constant\[k\]                             |
//! | `EncodeStringVal`   | (2)      | push the string constant, encoded              |
//! | `EncodeTableCell`   | (2)      | push the column cell constant, encoded         |
//! | `CreateTable`       | (1)      | pop n encoded values, write a catalog row      |
//! | `TableNameSearch`   | (2)      | push the table name constant                   |
//! | `WhereCondition`    | (2)      | push the predicate constant                    |
//! | `CreateTableIndex`  | (2)      | pop columns, patch flags, backfill the index   |
//! | `Select`            | (1)      | pop n operands, scan, push found rows          |
//! | `InsertRow`         | (1)      | pop n encoded values, append a data row        |
//! | `TableInfo`         | (2)      | push a TableInfo builder for the named table   |
//! | `ColInfo`           | (2)      | mark the named column's slot in the builder    |
//! | `ValInfo`           | (2)      | deposit a value into the marked slot           |
//! | `Insert`            | —        | finalize the builder, append the row           |
//!
//! There are no jump or call opcodes; a statement compiles to a straight
//! line of pushes ending in one effectful op (plus the drain after
//! `Select`).

use eyre::{bail, Result};

/// Instruction stream of one compiled statement.
pub type Instructions = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Constant = 0,
    EncodeStringVal = 1,
    EncodeTableCell = 2,
    CreateTable = 3,
    TableNameSearch = 4,
    WhereCondition = 5,
    CreateTableIndex = 6,
    Select = 7,
    InsertRow = 8,
    TableInfo = 9,
    ColInfo = 10,
    ValInfo = 11,
    Insert = 12,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0 => Opcode::Constant,
            1 => Opcode::EncodeStringVal,
            2 => Opcode::EncodeTableCell,
            3 => Opcode::CreateTable,
            4 => Opcode::TableNameSearch,
            5 => Opcode::WhereCondition,
            6 => Opcode::CreateTableIndex,
            7 => Opcode::Select,
            8 => Opcode::InsertRow,
            9 => Opcode::TableInfo,
            10 => Opcode::ColInfo,
            11 => Opcode::ValInfo,
            12 => Opcode::Insert,
            other => bail!("undefined opcode byte: {}", other),
        })
    }

    /// Byte widths of this opcode's operands, in order.
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            Opcode::Constant
            | Opcode::EncodeStringVal
            | Opcode::EncodeTableCell
            | Opcode::TableNameSearch
            | Opcode::WhereCondition
            | Opcode::CreateTableIndex
            | Opcode::TableInfo
            | Opcode::ColInfo
            | Opcode::ValInfo => &[2],
            Opcode::CreateTable | Opcode::Select | Opcode::InsertRow => &[1],
            Opcode::Insert => &[],
        }
    }
}

/// Assembles one instruction, encoding operands big-endian at their
/// declared widths.
pub fn make(op: Opcode, operands: &[usize]) -> Instructions {
    let widths = op.operand_widths();
    debug_assert_eq!(operands.len(), widths.len(), "operand count for {:?}", op);

    let mut ins = Vec::with_capacity(1 + widths.iter().sum::<usize>());
    ins.push(op as u8);
    for (operand, width) in operands.iter().zip(widths) {
        match width {
            1 => ins.push(*operand as u8),
            2 => ins.extend_from_slice(&(*operand as u16).to_be_bytes()),
            w => unreachable!("unsupported operand width {}", w),
        }
    }
    ins
}

/// Reads one operand of `width` bytes at `pos`, big-endian.
pub fn read_operand(ins: &[u8], pos: usize, width: usize) -> Result<usize> {
    if pos + width > ins.len() {
        bail!("truncated operand at byte {}", pos);
    }
    Ok(match width {
        1 => ins[pos] as usize,
        2 => u16::from_be_bytes(ins[pos..pos + 2].try_into().unwrap()) as usize,
        w => bail!("unsupported operand width {}", w),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_encodes_big_endian() {
        let ins = make(Opcode::Constant, &[0x0102]);
        assert_eq!(ins, vec![Opcode::Constant as u8, 0x01, 0x02]);

        let ins = make(Opcode::Select, &[3]);
        assert_eq!(ins, vec![Opcode::Select as u8, 3]);

        let ins = make(Opcode::Insert, &[]);
        assert_eq!(ins, vec![Opcode::Insert as u8]);
    }

    #[test]
    fn read_operand_round_trips_make() {
        let ins = make(Opcode::TableInfo, &[65534]);
        let operand = read_operand(&ins, 1, 2).unwrap();
        assert_eq!(operand, 65534);
    }

    #[test]
    fn every_opcode_byte_round_trips() {
        for byte in 0..=12u8 {
            let op = Opcode::from_byte(byte).unwrap();
            assert_eq!(op as u8, byte);
        }
        assert!(Opcode::from_byte(13).is_err());
    }

    #[test]
    fn truncated_operand_is_an_error() {
        let ins = vec![Opcode::Constant as u8, 0x01];
        assert!(read_operand(&ins, 1, 2).is_err());
    }
}
