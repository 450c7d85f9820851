//! # Catalog Row Codec
//!
//! One catalog row is appended to `tables.db` per CREATE TABLE. Its frame
//! payload is:
//!
//! ```text
//! +---------+----------------------------------------+-----------+-------+
//! | name \0 | (col \0  type \0  idx  uniq  pk)*      | count u32 | pad 4 |
//! +---------+----------------------------------------+-----------+-------+
//! ```
//!
//! Flag bytes are `0xFF` (true) / `0xFD` (false). The trailing 8 bytes are
//! the row count (u32 LE plus pad), written as zero at CREATE TABLE and
//! patched in place on every insert.
//!
//! Two in-place patches are legal after the row is written, both
//! same-length: a column's idx flag byte (CREATE INDEX) and the trailing
//! count. This module computes the byte offsets those patches need; the
//! actual writes go through [`HeapFile::patch_at`](crate::storage::HeapFile).

use eyre::{bail, ensure, Result};

use super::table::{ColumnDef, TableDef};
use crate::vm::encoding::{encode_bool, encode_string_into, BOOL_FALSE, BOOL_TRUE};

/// Trailing count field: u32 LE plus 4 pad bytes.
pub const COUNT_SIZE: usize = 8;

/// Serializes a catalog row payload with a zero row count.
pub fn encode_catalog_payload(name: &str, columns: &[ColumnDef]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_string_into(&mut out, name);
    for col in columns {
        encode_string_into(&mut out, &col.name);
        encode_string_into(&mut out, &col.col_type);
        out.push(encode_bool(col.index));
        out.push(encode_bool(col.unique));
        out.push(encode_bool(col.pk));
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out
}

fn read_cstr(payload: &[u8], pos: usize) -> Result<(String, usize)> {
    let end = payload[pos..]
        .iter()
        .position(|&b| b == 0x00)
        .map(|i| pos + i);
    let Some(end) = end else {
        bail!("unterminated name field at byte {}", pos);
    };
    let s = std::str::from_utf8(&payload[pos..end])
        .map_err(|_| eyre::eyre!("non-UTF-8 name field at byte {}", pos))?;
    Ok((s.to_string(), end + 1))
}

fn read_flag(payload: &[u8], pos: usize) -> Result<(bool, usize)> {
    match payload.get(pos) {
        Some(&BOOL_TRUE) => Ok((true, pos + 1)),
        Some(&BOOL_FALSE) => Ok((false, pos + 1)),
        Some(&other) => bail!("bad flag byte {:#04x} at byte {}", other, pos),
        None => bail!("truncated flag byte at {}", pos),
    }
}

/// Decodes a catalog row payload into a [`TableDef`] with its row count.
pub fn decode_catalog_payload(payload: &[u8]) -> Result<TableDef> {
    ensure!(
        payload.len() > COUNT_SIZE,
        "catalog payload too short: {} bytes",
        payload.len()
    );
    let cells_end = payload.len() - COUNT_SIZE;

    let (name, mut pos) = read_cstr(payload, 0)?;
    ensure!(pos <= cells_end, "catalog payload ends inside table name");

    let mut columns = Vec::new();
    while pos < cells_end {
        let (col_name, next) = read_cstr(payload, pos)?;
        pos = next;
        let (col_type, next) = read_cstr(payload, pos)?;
        pos = next;
        let (index, next) = read_flag(payload, pos)?;
        pos = next;
        let (unique, next) = read_flag(payload, pos)?;
        pos = next;
        let (pk, next) = read_flag(payload, pos)?;
        pos = next;
        ensure!(pos <= cells_end, "column cell runs into the row count");
        columns.push(ColumnDef {
            name: col_name,
            col_type,
            index,
            unique,
            pk,
        });
    }

    let row_count = u32::from_le_bytes(payload[cells_end..cells_end + 4].try_into().unwrap());

    let mut table = TableDef::new(name, columns);
    table.row_count = row_count;
    Ok(table)
}

/// Byte offset, within the payload, of the idx flag of `column`.
pub fn idx_flag_offset(payload: &[u8], column: &str) -> Result<usize> {
    let cells_end = payload.len() - COUNT_SIZE;
    let (_, mut pos) = read_cstr(payload, 0)?;

    while pos < cells_end {
        let (col_name, next) = read_cstr(payload, pos)?;
        pos = next;
        let (_, next) = read_cstr(payload, pos)?;
        pos = next;
        if col_name == column {
            return Ok(pos); // idx is the first flag byte
        }
        pos += 3;
    }
    bail!("column '{}' not present in catalog row", column)
}

/// Byte offset, within the payload, of the trailing u32 row count.
pub fn row_count_offset(payload: &[u8]) -> usize {
    payload.len() - COUNT_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "varchar"),
            ColumnDef::new("breed", "varchar"),
        ]
    }

    #[test]
    fn encode_matches_documented_layout() {
        let payload = encode_catalog_payload("dogs", &columns());
        let flags = [BOOL_FALSE, BOOL_FALSE, BOOL_FALSE];
        let expected = [
            b"dogs\0".as_slice(),
            b"name\0varchar\0".as_slice(),
            flags.as_slice(),
            b"breed\0varchar\0".as_slice(),
            flags.as_slice(),
            [0u8; 8].as_slice(),
        ]
        .concat();
        assert_eq!(payload, expected);
    }

    #[test]
    fn decode_round_trips_encode() {
        let payload = encode_catalog_payload("dogs", &columns());
        let table = decode_catalog_payload(&payload).unwrap();
        assert_eq!(table.name, "dogs");
        assert_eq!(table.columns, columns());
        assert_eq!(table.row_count, 0);
    }

    #[test]
    fn decode_reads_patched_count_and_flags() {
        let mut payload = encode_catalog_payload("dogs", &columns());
        let count_at = row_count_offset(&payload);
        payload[count_at..count_at + 4].copy_from_slice(&42u32.to_le_bytes());
        let flag_at = idx_flag_offset(&payload, "breed").unwrap();
        payload[flag_at] = BOOL_TRUE;

        let table = decode_catalog_payload(&payload).unwrap();
        assert_eq!(table.row_count, 42);
        assert!(!table.columns[0].index);
        assert!(table.columns[1].index);
    }

    #[test]
    fn idx_flag_offset_lands_on_the_flag_byte() {
        let payload = encode_catalog_payload("dogs", &columns());
        let offset = idx_flag_offset(&payload, "name").unwrap();
        assert_eq!(offset, "dogs\0name\0varchar\0".len());
        assert_eq!(payload[offset], BOOL_FALSE);
    }

    #[test]
    fn unknown_column_has_no_flag_offset() {
        let payload = encode_catalog_payload("dogs", &columns());
        assert!(idx_flag_offset(&payload, "age").is_err());
    }

    #[test]
    fn corrupt_flag_byte_is_an_error() {
        let mut payload = encode_catalog_payload("dogs", &columns());
        let flag_at = idx_flag_offset(&payload, "name").unwrap();
        payload[flag_at] = 0x33;
        assert!(decode_catalog_payload(&payload).is_err());
    }
}
