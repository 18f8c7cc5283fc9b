// Transcript Generator - Core Library
// Exposes the pipeline for the CLI, the interactive surface, and tests

pub mod error;
pub mod table;
pub mod placeholder;
pub mod validator;
pub mod writeups;
pub mod assembler;
pub mod export;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{
    IssueKind, Result, Severity, TranscriptError, ValidationIssue, ValidationReport,
};
pub use table::{
    DataTable, PersonnelRecord, TableRow, WriteupRow,
    ACCOLADE_PREFIX, NAME_COLUMN, TRANSCRIPT_COLUMN,
};
pub use placeholder::{MissingVariablePolicy, Syntax};
pub use validator::{ValidatedInput, Validator};
pub use writeups::{WriteupEntry, WriteupIndex};
pub use assembler::{AssembledRecord, Transcript, TranscriptAssembler};
pub use export::{
    CsvExporter, DocxExporter, DocxTemplate, ExportOutcome, Exporter, OutputType,
};
pub use config::GenerationConfig;
pub use pipeline::{run, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
