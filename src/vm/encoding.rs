//! # Field Codec
//!
//! Values inside catalog and data rows are encoded as a flat byte stream
//! of self-delimiting fields:
//!
//! | Field   | Encoding                          |
//! |---------|-----------------------------------|
//! | string  | UTF-8 bytes followed by `0x00`    |
//! | true    | the single byte `0xFF`            |
//! | false   | the single byte `0xFD`            |
//! | NULL    | the single byte `0xFE`            |
//!
//! The sentinel bytes sit outside the printable ASCII range used by
//! identifiers and quoted strings, so the decoder can dispatch on the
//! first byte of each field. Strings must not contain `0x00`.

use eyre::{ensure, Result};

pub const BOOL_TRUE: u8 = 0xFF;
pub const BOOL_FALSE: u8 = 0xFD;
pub const NULL_FIELD: u8 = 0xFE;

/// One decoded field of a row payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Str(String),
    Bool(bool),
    Null,
}

impl Field {
    /// Rendering used by SELECT output and `\d`.
    pub fn display(&self) -> String {
        match self {
            Field::Str(s) => s.clone(),
            Field::Bool(true) => "true".to_string(),
            Field::Bool(false) => "false".to_string(),
            Field::Null => "NULL".to_string(),
        }
    }
}

/// Appends `s` and its terminator to `out`.
pub fn encode_string_into(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0x00);
}

pub fn encode_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    encode_string_into(&mut out, s);
    out
}

pub fn encode_bool(b: bool) -> u8 {
    if b {
        BOOL_TRUE
    } else {
        BOOL_FALSE
    }
}

/// Decodes a field stream. Stops only at the end of the slice; embedded
/// sentinel bytes inside strings are a framing error.
pub fn decode_fields(payload: &[u8]) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    let mut pos = 0usize;
    while pos < payload.len() {
        match payload[pos] {
            BOOL_TRUE => {
                fields.push(Field::Bool(true));
                pos += 1;
            }
            BOOL_FALSE => {
                fields.push(Field::Bool(false));
                pos += 1;
            }
            NULL_FIELD => {
                fields.push(Field::Null);
                pos += 1;
            }
            _ => {
                let end = payload[pos..]
                    .iter()
                    .position(|&b| b == 0x00)
                    .map(|i| pos + i);
                let Some(end) = end else {
                    eyre::bail!("unterminated string field at byte {}", pos);
                };
                let s = std::str::from_utf8(&payload[pos..end])
                    .map_err(|_| eyre::eyre!("non-UTF-8 string field at byte {}", pos))?;
                fields.push(Field::Str(s.to_string()));
                pos = end + 1;
            }
        }
    }
    Ok(fields)
}

/// Decodes a data-row payload: the table name followed by the row values.
pub fn decode_row(payload: &[u8]) -> Result<(String, Vec<Field>)> {
    let mut fields = decode_fields(payload)?;
    ensure!(!fields.is_empty(), "empty row payload");
    let name = match fields.remove(0) {
        Field::Str(s) => s,
        other => eyre::bail!("row payload does not start with a table name: {:?}", other),
    };
    Ok((name, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let encoded = encode_string("cane corso");
        assert_eq!(encoded.last(), Some(&0x00));
        let fields = decode_fields(&encoded).unwrap();
        assert_eq!(fields, vec![Field::Str("cane corso".to_string())]);
    }

    #[test]
    fn sentinel_bytes_decode_standalone() {
        let payload = [BOOL_TRUE, BOOL_FALSE, NULL_FIELD];
        let fields = decode_fields(&payload).unwrap();
        assert_eq!(
            fields,
            vec![Field::Bool(true), Field::Bool(false), Field::Null]
        );
    }

    #[test]
    fn mixed_stream_decodes_in_order() {
        let mut payload = Vec::new();
        encode_string_into(&mut payload, "dogs");
        encode_string_into(&mut payload, "winnie");
        payload.push(NULL_FIELD);
        payload.push(encode_bool(false));

        let fields = decode_fields(&payload).unwrap();
        assert_eq!(
            fields,
            vec![
                Field::Str("dogs".to_string()),
                Field::Str("winnie".to_string()),
                Field::Null,
                Field::Bool(false),
            ]
        );
    }

    #[test]
    fn decode_row_splits_table_name_from_values() {
        let mut payload = Vec::new();
        encode_string_into(&mut payload, "wishlist");
        encode_string_into(&mut payload, "4090");
        payload.push(NULL_FIELD);

        let (name, values) = decode_row(&payload).unwrap();
        assert_eq!(name, "wishlist");
        assert_eq!(values, vec![Field::Str("4090".to_string()), Field::Null]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(decode_fields(b"abc").is_err());
    }

    #[test]
    fn empty_payload_decodes_to_no_fields() {
        assert!(decode_fields(b"").unwrap().is_empty());
    }

    #[test]
    fn empty_string_field_round_trips() {
        let encoded = encode_string("");
        let fields = decode_fields(&encoded).unwrap();
        assert_eq!(fields, vec![Field::Str(String::new())]);
    }
}
