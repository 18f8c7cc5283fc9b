// 📤 Exporters - assembled transcripts → files
// CSV: one consolidated file. DOCX: one populated template per person.

pub mod csv;
pub mod docx;

pub use self::csv::CsvExporter;
pub use self::docx::{DocxExporter, DocxTemplate};

use crate::assembler::AssembledRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output formats the pipeline can produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Csv,
    Docx,
}

impl OutputType {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Csv => "csv",
            OutputType::Docx => "docx",
        }
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputType::Csv),
            "docx" => Ok(OutputType::Docx),
            other => Err(format!("unsupported output type: {} (expected csv or docx)", other)),
        }
    }
}

/// Files written by one export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub files: Vec<PathBuf>,
}

/// Renders a batch of assembled records
///
/// # Contract
///
/// - `headers` is the data-table header in file order; every record carries
///   exactly these fields.
/// - Records are written in the order given.
/// - A failure stops the export; files already written stay on disk.
pub trait Exporter {
    fn export(&self, headers: &[String], batch: &[AssembledRecord]) -> Result<ExportOutcome>;

    fn output_type(&self) -> OutputType;
}
