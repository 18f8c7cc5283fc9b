// 🚨 Error Taxonomy - Structural / Value / Reference / IO
// Every failure the pipeline can surface to the operator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// VALIDATION ISSUES
// ============================================================================

/// Which rule family an issue belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// Missing required column, malformed header, empty table
    Structural,
    /// Bad flag value, empty writeup, duplicate accolade, whitespace in a column name
    Value,
    /// Accolade or placeholder that points at nothing
    Reference,
    /// Input missing/unreadable, output location unusable
    Io,
}

impl IssueKind {
    pub fn name(&self) -> &str {
        match self {
            IssueKind::Structural => "StructuralError",
            IssueKind::Value => "ValueError",
            IssueKind::Reference => "ReferenceError",
            IssueKind::Io => "IOError",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,   // Blocks generation
    Warning, // Reported, generation proceeds
}

/// One violated rule, with enough location to fix the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Source label, e.g. "data", "writeups", "template", "output"
    pub source: String,
    /// 1-based file line (header = line 1)
    pub row: Option<usize>,
    pub column: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, source: &str, message: impl Into<String>) -> Self {
        ValidationIssue {
            kind,
            severity: Severity::Error,
            source: source.to_string(),
            row: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: IssueKind, source: &str, message: impl Into<String>) -> Self {
        ValidationIssue {
            severity: Severity::Warning,
            ..ValidationIssue::error(kind, source, message)
        }
    }

    /// Builder: attach the file line
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Builder: attach the column name
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.name(), self.source)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        if let Some(column) = &self.column {
            write!(f, " column '{}'", column)?;
        }
        write!(f, ": {}", self.message)
    }
}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

/// All issues found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Err(self) when any issue blocks generation, Ok(self) otherwise
    pub fn into_result(self) -> Result<ValidationReport> {
        if self.has_errors() {
            Err(TranscriptError::Validation(self))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors().count();
        write!(f, "validation failed with {} error(s)", count)?;
        for issue in self.errors() {
            write!(f, "\n  {}", issue)?;
        }
        Ok(())
    }
}

// ============================================================================
// PIPELINE ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("row {row}: writeup for accolade '{accolade}' references undefined variable '{field}'")]
    Substitution {
        row: usize,
        accolade: String,
        field: String,
    },

    #[error("template error: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("DOCX archive error in {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl TranscriptError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TranscriptError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        TranscriptError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        TranscriptError::Zip {
            path: path.into(),
            source,
        }
    }

    /// The validation report, if this is a validation failure
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            TranscriptError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display_with_locator() {
        let issue = ValidationIssue::error(IssueKind::Value, "data", "must be 'yes' or 'no'")
            .at_row(3)
            .in_column("accolade_punctual");

        assert_eq!(
            issue.to_string(),
            "[ValueError] data row 3 column 'accolade_punctual': must be 'yes' or 'no'"
        );
    }

    #[test]
    fn test_report_warnings_do_not_fail() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::warning(IssueKind::Reference, "template", "unused"));

        assert!(!report.has_errors());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_report_errors_fail() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::error(IssueKind::Structural, "data", "missing 'name'"));
        report.push(ValidationIssue::warning(IssueKind::Reference, "template", "unused"));

        let err = report.into_result().unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert!(err.to_string().contains("missing 'name'"));
    }
}
