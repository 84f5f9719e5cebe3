//! CSV parser for registry and water-level exports.
//!
//! Produces a [`RecordTable`]: a header row plus string cells. Nothing here
//! interprets the cells; that happens in [`crate::schema`] and the ingest
//! stages that follow it.

use anyhow::Result;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::path::Path;

/// Already-parsed tabular records, as handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from string slices. Handy for tests and embedding callers.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    /// Index of the header that equals `name` after trimming.
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Cell at `(row, col)`; short rows read as missing.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decodes CSV bytes into a [`RecordTable`].
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 CSV.
pub fn parse_table(bytes: &[u8]) -> Result<RecordTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RecordTable { headers, rows })
}

/// Reads and parses a CSV file from disk.
pub fn read_table(path: impl AsRef<Path>) -> Result<RecordTable> {
    let bytes = std::fs::read(path)?;
    parse_table(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_bytes_returns_empty_table() {
        let table = parse_table(&[]).unwrap();
        assert!(table.headers.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let invalid_bytes = vec![b'a', b',', 0xFF, 0xFE, b'\n', b'1', b',', b'2'];
        assert!(parse_table(&invalid_bytes).is_err());
    }

    #[test]
    fn test_parse_strips_bom_and_trims() {
        let bytes = "\u{feff}Date , Pipe_ID\n 2025-06-17 , 10028A1 \n".as_bytes();
        let table = parse_table(bytes).unwrap();

        assert_eq!(table.headers, vec!["Date", "Pipe_ID"]);
        assert_eq!(table.cell(0, 1), Some("10028A1"));
    }

    #[test]
    fn test_short_rows_read_as_missing() {
        let table = parse_table(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.cell(0, 1), Some("2"));
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.column("c"), Some(2));
    }
}
