// 📄 Tabular Input - CSV → in-memory tables and records
// Columns are discovered at runtime, so records are ordered key/value maps

use crate::error::{Result, TranscriptError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column prefix marking an accolade flag in the data table
pub const ACCOLADE_PREFIX: &str = "accolade_";

/// Required data column
pub const NAME_COLUMN: &str = "name";

/// Required writeups columns
pub const ACCOLADE_COLUMN: &str = "accolade";
pub const WRITEUP_COLUMN: &str = "writeup";

/// Output-only column appended by the CSV exporter
pub const TRANSCRIPT_COLUMN: &str = "transcript";

/// Strip the optional `accolade_` prefix so data columns and writeups rows agree
pub fn normalize_accolade_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(ACCOLADE_PREFIX).unwrap_or(trimmed)
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// One data row, keeping the file line it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// 1-based line in the source file (header = 1)
    pub line: usize,
    pub values: Vec<String>,
}

/// A parsed CSV file: header plus rows, nothing interpreted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl DataTable {
    /// Load a CSV file with a header row
    ///
    /// Rows with a different field count are kept as-is; the Validator reports them.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TranscriptError::io(path, e))?;
        Self::from_reader(file).map_err(|e| TranscriptError::csv(path, e))
    }

    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            // Prefer the reader's own position; quoted newlines make index+2 drift
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 2);
            rows.push(TableRow {
                line,
                values: record.iter().map(|v| v.to_string()).collect(),
            });
        }

        Ok(DataTable { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Columns prefixed `accolade_`, in header order
    pub fn accolade_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.starts_with(ACCOLADE_PREFIX))
            .map(|h| h.as_str())
            .collect()
    }

    /// Everything that is not an accolade flag
    pub fn variable_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| !h.starts_with(ACCOLADE_PREFIX))
            .map(|h| h.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value, empty string for short rows
    pub fn cell<'a>(&'a self, row: &'a TableRow, column: usize) -> &'a str {
        row.values.get(column).map(|v| v.as_str()).unwrap_or("")
    }
}

// ============================================================================
// PERSONNEL RECORD
// ============================================================================

/// One person: ordered field name → value, in data-table column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelRecord {
    line: usize,
    fields: Vec<(String, String)>,
}

impl PersonnelRecord {
    pub fn new(line: usize, fields: Vec<(String, String)>) -> Self {
        PersonnelRecord { line, fields }
    }

    /// Build from a table row; missing trailing cells become empty strings
    pub fn from_row(headers: &[String], row: &TableRow) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.values.get(i).cloned().unwrap_or_default()))
            .collect();
        PersonnelRecord::new(row.line, fields)
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> &str {
        self.get(NAME_COLUMN).unwrap_or("")
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// True when `accolade_<id>` holds `yes` (case-insensitive)
    pub fn holds(&self, accolade_id: &str) -> bool {
        let column = format!("{}{}", ACCOLADE_PREFIX, accolade_id);
        self.get(&column).map(is_yes).unwrap_or(false)
    }
}

/// Normalized flag test
pub fn is_yes(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

/// Flag cells must be exactly yes/no, ignoring case and surrounding blanks
pub fn is_flag(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("no")
}

// ============================================================================
// WRITEUP ROW
// ============================================================================

/// One row of the writeups table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteupRow {
    pub line: usize,
    pub accolade: String,
    pub writeup: String,
}

impl WriteupRow {
    pub fn new(line: usize, accolade: impl Into<String>, writeup: impl Into<String>) -> Self {
        WriteupRow {
            line,
            accolade: accolade.into(),
            writeup: writeup.into(),
        }
    }
}

/// Extract (accolade, writeup) rows; None if either column is missing
pub fn writeup_rows(table: &DataTable) -> Option<Vec<WriteupRow>> {
    let accolade = table.column_index(ACCOLADE_COLUMN)?;
    let writeup = table.column_index(WRITEUP_COLUMN)?;

    Some(
        table
            .rows
            .iter()
            .map(|row| {
                WriteupRow::new(
                    row.line,
                    table.cell(row, accolade),
                    table.cell(row, writeup),
                )
            })
            .collect(),
    )
}
