//! Sectioned binary round-trip.
//!
//! Layout: a 5-byte header (`SIFT` + version) followed by tagged
//! sections, each `tag u8 | length u64 LE | payload`:
//!
//! - `C` columns: table flags, column count, then per column the name,
//!   the type code and the fixed width.
//! - `B` body: row count, cells column by column, then the null bitmap
//!   and the row-status bytes when present.
//! - `R` reference: the deduplicated string pool for `RStr` columns;
//!   body cells store pool indexes, so string identity survives.
//!
//! Sections are accepted in any order; decoding resolves `columns`
//! first, then `body`, then `reference`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::column::{Column, ColumnType};
use crate::errors::TableError;
use crate::table::{Bitmap, ColumnData, Table};

const MAGIC: &[u8; 4] = b"SIFT";
const VERSION: u8 = 1;

const FLAG_NULLS: u8 = 0x01;
const FLAG_STATUS: u8 = 0x02;
const FLAG_INTERN: u8 = 0x04;

impl Table {
    /// Serialise the table to a byte buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);

        // Reference pool: content-deduplicated strings of RStr columns.
        let mut pool: Vec<&str> = Vec::new();
        let mut pool_index: FxHashMap<&str, u32> = FxHashMap::default();
        for data in self.data() {
            if let ColumnData::RStr(cells) = data {
                for cell in cells {
                    pool_index.entry(cell.as_ref()).or_insert_with(|| {
                        pool.push(cell.as_ref());
                        u32::try_from(pool.len() - 1).unwrap_or(u32::MAX)
                    });
                }
            }
        }

        write_section(&mut out, b'C', &self.encode_columns());
        write_section(&mut out, b'B', &self.encode_body(&pool_index));
        if !pool.is_empty() {
            write_section(&mut out, b'R', &encode_reference(&pool));
        }
        out
    }

    /// Decode a table serialised with [`Table::to_bytes`].
    ///
    /// Sections may appear in any order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let mut reader = Reader::new(bytes);
        let magic = reader.bytes(4)?;
        if magic != MAGIC {
            return Err(TableError::Corrupt("bad magic".to_string()));
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(TableError::Corrupt(format!("unsupported version {version}")));
        }

        let mut columns_section: Option<&[u8]> = None;
        let mut body_section: Option<&[u8]> = None;
        let mut reference_section: Option<&[u8]> = None;
        while !reader.is_empty() {
            let tag = reader.u8()?;
            let length = reader.u64()?;
            let length = usize::try_from(length)
                .map_err(|_| TableError::Corrupt("section length overflow".to_string()))?;
            let payload = reader.bytes(length)?;
            match tag {
                b'C' => columns_section = Some(payload),
                b'B' => body_section = Some(payload),
                b'R' => reference_section = Some(payload),
                other => {
                    return Err(TableError::Corrupt(format!("unknown section tag {other:#04x}")))
                }
            }
        }

        let columns_section = columns_section.ok_or(TableError::MissingSection("columns"))?;
        let body_section = body_section.ok_or(TableError::MissingSection("body"))?;

        let (columns, flags) = decode_columns(columns_section)?;
        let pool = match reference_section {
            Some(payload) => decode_reference(payload)?,
            None => Vec::new(),
        };
        decode_body(body_section, columns, flags, &pool)
    }

    fn encode_columns(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut flags = 0u8;
        if self.nulls().is_some() {
            flags |= FLAG_NULLS;
        }
        if self.row_status_bytes().is_some() {
            flags |= FLAG_STATUS;
        }
        if self.is_interning() {
            flags |= FLAG_INTERN;
        }
        out.push(flags);
        #[allow(clippy::cast_possible_truncation, reason = "column counts are tiny")]
        out.extend_from_slice(&(self.column_count() as u32).to_le_bytes());
        for column in self.columns() {
            #[allow(clippy::cast_possible_truncation, reason = "column names are short")]
            out.extend_from_slice(&(column.name().len() as u16).to_le_bytes());
            out.extend_from_slice(column.name().as_bytes());
            out.push(column.ctype().code());
            out.extend_from_slice(&column.fixed().to_le_bytes());
        }
        out
    }

    fn encode_body(&self, pool_index: &FxHashMap<&str, u32>) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.row_count() as u64).to_le_bytes());
        for data in self.data() {
            match data {
                ColumnData::Int64(cells) => {
                    for cell in cells {
                        out.extend_from_slice(&cell.to_le_bytes());
                    }
                }
                ColumnData::F64(cells) => {
                    for cell in cells {
                        out.extend_from_slice(&cell.to_bits().to_le_bytes());
                    }
                }
                ColumnData::Bool(cells) => {
                    for cell in cells {
                        out.push(u8::from(*cell));
                    }
                }
                ColumnData::Str(cells) => {
                    for cell in cells {
                        write_blob(&mut out, cell.as_bytes());
                    }
                }
                ColumnData::RStr(cells) => {
                    for cell in cells {
                        let index = pool_index.get(cell.as_ref()).copied().unwrap_or(0);
                        out.extend_from_slice(&index.to_le_bytes());
                    }
                }
                ColumnData::Binary(cells) => {
                    for cell in cells {
                        write_blob(&mut out, cell);
                    }
                }
                ColumnData::Nullptr(cells) => {
                    for cell in cells {
                        out.extend_from_slice(&cell.to_le_bytes());
                    }
                }
                ColumnData::Pair(cells) => {
                    for (low, high) in cells {
                        out.extend_from_slice(&low.to_le_bytes());
                        out.extend_from_slice(&high.to_le_bytes());
                    }
                }
            }
        }
        if let Some(nulls) = self.nulls() {
            out.extend_from_slice(&(nulls.len() as u64).to_le_bytes());
            out.extend_from_slice(nulls.bytes());
        }
        if let Some(status) = self.row_status_bytes() {
            out.extend_from_slice(status);
        }
        out
    }
}

fn write_section(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
}

fn write_blob(out: &mut Vec<u8>, bytes: &[u8]) {
    #[allow(clippy::cast_possible_truncation, reason = "cell payloads stay below u32::MAX")]
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn encode_reference(pool: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    #[allow(clippy::cast_possible_truncation, reason = "pool stays below u32::MAX entries")]
    out.extend_from_slice(&(pool.len() as u32).to_le_bytes());
    for entry in pool {
        write_blob(&mut out, entry.as_bytes());
    }
    out
}

fn decode_columns(payload: &[u8]) -> Result<(Vec<Column>, u8), TableError> {
    let mut reader = Reader::new(payload);
    let flags = reader.u8()?;
    let count = reader.u32()? as usize;
    let mut columns = Vec::with_capacity(count);
    for _ in 0..count {
        let name_len = reader.u16()? as usize;
        let name = std::str::from_utf8(reader.bytes(name_len)?)
            .map_err(|_| TableError::Corrupt("column name is not UTF-8".to_string()))?
            .to_string();
        let code = reader.u8()?;
        let ctype = ColumnType::from_code(code)
            .ok_or_else(|| TableError::Corrupt(format!("unknown column type {code}")))?;
        let _fixed = reader.u32()?;
        columns.push(Column::new(name, ctype));
    }
    Ok((columns, flags))
}

fn decode_reference(payload: &[u8]) -> Result<Vec<Arc<str>>, TableError> {
    let mut reader = Reader::new(payload);
    let count = reader.u32()? as usize;
    let mut pool = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader.u32()? as usize;
        let text = std::str::from_utf8(reader.bytes(length)?)
            .map_err(|_| TableError::Corrupt("reference string is not UTF-8".to_string()))?;
        pool.push(Arc::from(text));
    }
    Ok(pool)
}

fn decode_body(
    payload: &[u8],
    columns: Vec<Column>,
    flags: u8,
    pool: &[Arc<str>],
) -> Result<Table, TableError> {
    let mut reader = Reader::new(payload);
    let rows = usize::try_from(reader.u64()?)
        .map_err(|_| TableError::Corrupt("row count overflow".to_string()))?;

    let mut data = Vec::with_capacity(columns.len());
    for column in &columns {
        data.push(decode_cells(&mut reader, column.ctype(), rows, pool)?);
    }

    let nulls = if flags & FLAG_NULLS != 0 {
        let bits = usize::try_from(reader.u64()?)
            .map_err(|_| TableError::Corrupt("bitmap length overflow".to_string()))?;
        if bits != rows * columns.len() {
            return Err(TableError::Corrupt("null bitmap size mismatch".to_string()));
        }
        let bytes = reader.bytes(bits.div_ceil(8))?.to_vec();
        Some(Bitmap::from_bytes(bytes, bits))
    } else {
        None
    };

    let row_status = if flags & FLAG_STATUS != 0 {
        Some(reader.bytes(rows)?.to_vec())
    } else {
        None
    };

    Ok(Table::restore(
        columns,
        data,
        rows,
        nulls,
        row_status,
        flags & FLAG_INTERN != 0,
    ))
}

fn decode_cells(
    reader: &mut Reader<'_>,
    ctype: ColumnType,
    rows: usize,
    pool: &[Arc<str>],
) -> Result<ColumnData, TableError> {
    Ok(match ctype {
        ColumnType::Int64 => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                cells.push(reader.i64()?);
            }
            ColumnData::Int64(cells)
        }
        ColumnType::F64 => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                cells.push(f64::from_bits(reader.u64()?));
            }
            ColumnData::F64(cells)
        }
        ColumnType::Bool => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                cells.push(reader.u8()? != 0);
            }
            ColumnData::Bool(cells)
        }
        ColumnType::Str => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                let length = reader.u32()? as usize;
                let text = std::str::from_utf8(reader.bytes(length)?)
                    .map_err(|_| TableError::Corrupt("string cell is not UTF-8".to_string()))?;
                cells.push(text.to_string());
            }
            ColumnData::Str(cells)
        }
        ColumnType::RStr => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                let index = reader.u32()? as usize;
                let entry = pool.get(index).ok_or_else(|| {
                    TableError::Corrupt(format!("reference index {index} out of range"))
                })?;
                cells.push(entry.clone());
            }
            ColumnData::RStr(cells)
        }
        ColumnType::Binary => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                let length = reader.u32()? as usize;
                cells.push(reader.bytes(length)?.to_vec());
            }
            ColumnData::Binary(cells)
        }
        ColumnType::Nullptr => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                cells.push(reader.u64()?);
            }
            ColumnData::Nullptr(cells)
        }
        ColumnType::Pair => {
            let mut cells = Vec::with_capacity(rows);
            for _ in 0..rows {
                let low = reader.i64()?;
                let high = reader.i64()?;
                cells.push((low, high));
            }
            ColumnData::Pair(cells)
        }
    })
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn is_empty(&self) -> bool {
        self.at >= self.bytes.len()
    }

    fn bytes(&mut self, count: usize) -> Result<&'a [u8], TableError> {
        if self.at + count > self.bytes.len() {
            return Err(TableError::Corrupt("unexpected end of data".to_string()));
        }
        let slice = &self.bytes[self.at..self.at + count];
        self.at += count;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, TableError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, TableError> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, TableError> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64, TableError> {
        let bytes = self.bytes(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(array))
    }

    fn i64(&mut self) -> Result<i64, TableError> {
        let bytes = self.bytes(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(array))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert on known-good inputs")]
mod tests {
    use crate::column::{Column, ColumnType};
    use crate::table::{Table, TableOptions};
    use pretty_assertions::assert_eq;
    use sift_value::Value;

    fn sample() -> Table {
        let mut table = Table::with_options(
            vec![
                Column::new("key", ColumnType::Int64),
                Column::new("filename", ColumnType::RStr),
                Column::new("ratio", ColumnType::F64),
                Column::new("line", ColumnType::Str),
            ],
            TableOptions {
                null_bitmap: true,
                row_status: true,
                intern_strings: true,
            },
        );
        for (key, name, ratio, line) in [
            (1i64, "a.c", 0.5f64, "int x;"),
            (2, "a.c", 1.25, "foo"),
            (3, "b.c", -2.0, ""),
        ] {
            #[allow(clippy::unwrap_used, reason = "arity matches")]
            table
                .row_push(&[
                    Value::Int(key),
                    Value::from(name),
                    Value::Float(ratio),
                    Value::from(line),
                ])
                .unwrap();
        }
        // A row with nulls, plus a status flag.
        let row = table.row_add();
        table.set_row_flags(row, 0x01);
        table
    }

    fn assert_tables_equal(left: &Table, right: &Table) {
        assert_eq!(left.row_count(), right.row_count());
        assert_eq!(left.columns(), right.columns());
        for row in 0..left.row_count() {
            assert_eq!(left.row_values(row), right.row_values(row), "row {row}");
            assert_eq!(left.row_flags(row), right.row_flags(row), "status {row}");
        }
    }

    // === Round trip ===

    #[test]
    fn round_trip_preserves_everything() {
        let table = sample();
        let bytes = table.to_bytes();
        #[allow(clippy::unwrap_used, reason = "just-encoded data decodes")]
        let decoded = Table::from_bytes(&bytes).unwrap();
        assert_tables_equal(&table, &decoded);
    }

    #[test]
    fn sections_are_accepted_in_either_order() {
        let table = sample();
        let bytes = table.to_bytes();

        // Re-split the stream into sections and reverse their order.
        let header = &bytes[..5];
        let mut sections = Vec::new();
        let mut at = 5usize;
        while at < bytes.len() {
            #[allow(clippy::unwrap_used, reason = "slice is 8 bytes")]
            let length_bytes: [u8; 8] = bytes[at + 1..at + 9].try_into().unwrap();
            let length = u64::from_le_bytes(length_bytes) as usize;
            sections.push(&bytes[at..at + 9 + length]);
            at += 9 + length;
        }
        sections.reverse();
        let mut reordered = header.to_vec();
        for section in sections {
            reordered.extend_from_slice(section);
        }

        #[allow(clippy::unwrap_used, reason = "reordered sections stay valid")]
        let decoded = Table::from_bytes(&reordered).unwrap();
        assert_tables_equal(&table, &decoded);
    }

    #[test]
    fn truncated_data_is_rejected() {
        let table = sample();
        let bytes = table.to_bytes();
        assert!(Table::from_bytes(&bytes[..bytes.len() - 3]).is_err());
        assert!(Table::from_bytes(&bytes[..4]).is_err());
        assert!(Table::from_bytes(b"JUNK\x01").is_err());
    }

    #[test]
    fn missing_body_is_reported() {
        let table = sample();
        let bytes = table.to_bytes();
        // Keep only the header and the columns section.
        #[allow(clippy::unwrap_used, reason = "slice is 8 bytes")]
        let length_bytes: [u8; 8] = bytes[6..14].try_into().unwrap();
        let columns_len = u64::from_le_bytes(length_bytes) as usize;
        let truncated = &bytes[..5 + 9 + columns_len];
        let result = Table::from_bytes(truncated);
        assert_eq!(
            result.err(),
            Some(crate::TableError::MissingSection("body"))
        );
    }

    #[test]
    fn empty_table_round_trips() {
        let table = Table::new(vec![Column::new("count", ColumnType::Int64)]);
        #[allow(clippy::unwrap_used, reason = "just-encoded data decodes")]
        let decoded = Table::from_bytes(&table.to_bytes()).unwrap();
        assert_eq!(decoded.row_count(), 0);
        assert_eq!(decoded.columns(), table.columns());
    }

    // === Property tests ===

    #[allow(clippy::disallowed_types, reason = "proptest macros internally use Arc")]
    mod proptest_round_trip {
        use super::{assert_tables_equal, Column, ColumnType, Table, TableOptions};
        use proptest::prelude::*;
        use sift_value::Value;

        proptest! {
            #[test]
            fn arbitrary_rows_round_trip(
                rows in proptest::collection::vec(
                    (any::<i64>(), "[a-z./]{0,12}", -1.0e9f64..1.0e9, any::<bool>()),
                    0..32,
                ),
            ) {
                let mut table = Table::with_options(
                    vec![
                        Column::new("key", ColumnType::Int64),
                        Column::new("name", ColumnType::RStr),
                        Column::new("ratio", ColumnType::F64),
                        Column::new("flag", ColumnType::Bool),
                    ],
                    TableOptions {
                        null_bitmap: true,
                        row_status: true,
                        intern_strings: true,
                    },
                );
                for (key, name, ratio, flag) in &rows {
                    let pushed = table.row_push(&[
                        Value::Int(*key),
                        Value::Str(name.clone()),
                        Value::Float(*ratio),
                        Value::Bool(*flag),
                    ]);
                    prop_assert!(pushed.is_ok());
                }
                let decoded = Table::from_bytes(&table.to_bytes());
                prop_assert!(decoded.is_ok());
                if let Ok(decoded) = decoded {
                    assert_tables_equal(&table, &decoded);
                }
            }
        }
    }
}
