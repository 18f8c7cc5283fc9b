// ✅ Validator - structural and value checks before anything is generated
// Collects every violation with row/column locators; never mutates input

use crate::error::{IssueKind, Result, ValidationIssue, ValidationReport};
use crate::export::DocxTemplate;
use crate::placeholder::{placeholder_names, MissingVariablePolicy, Syntax};
use crate::table::{
    is_flag, writeup_rows, DataTable, PersonnelRecord, ACCOLADE_COLUMN,
    ACCOLADE_PREFIX, NAME_COLUMN, TRANSCRIPT_COLUMN, WRITEUP_COLUMN,
};
use crate::writeups::WriteupIndex;
use std::collections::HashSet;
use std::path::Path;

/// True when a file can actually be created in `dir`
fn is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

const DATA: &str = "data";
const WRITEUPS: &str = "writeups";
const TEMPLATE: &str = "template";
const OUTPUT: &str = "output";

/// Normalized, validated input ready for assembly
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub headers: Vec<String>,
    pub records: Vec<PersonnelRecord>,
    pub index: WriteupIndex,
    /// Warnings only; errors never reach this point
    pub report: ValidationReport,
}

pub struct Validator {
    policy: MissingVariablePolicy,
}

impl Validator {
    pub fn new() -> Self {
        Validator {
            policy: MissingVariablePolicy::Fail,
        }
    }

    /// Builder: undefined `${var}` in writeups is an error under `Fail`, a warning under `Literal`
    pub fn with_policy(mut self, policy: MissingVariablePolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // FILE CHECKS
    // ========================================================================

    /// Input file must exist and carry the expected extension
    pub fn check_input_file(path: &Path, source: &str, extension: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        if !path.is_file() {
            report.push(ValidationIssue::error(
                IssueKind::Io,
                source,
                format!("File does not exist: {}", path.display()),
            ));
            return report;
        }

        let actual = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if actual != extension {
            report.push(ValidationIssue::error(
                IssueKind::Io,
                source,
                format!("File must be a .{} file, got: '.{}'", extension, actual),
            ));
        }

        report
    }

    /// Existing directory must be writable; a missing one needs an existing parent
    pub fn check_output_dir(path: &Path) -> ValidationReport {
        let mut report = ValidationReport::new();

        if path.exists() {
            if !path.is_dir() {
                report.push(ValidationIssue::error(
                    IssueKind::Io,
                    OUTPUT,
                    format!("Output path exists but is not a directory: {}", path.display()),
                ));
            } else if !is_writable(path) {
                report.push(ValidationIssue::error(
                    IssueKind::Io,
                    OUTPUT,
                    format!("Output directory is not writable: {}", path.display()),
                ));
            }
            return report;
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            report.push(ValidationIssue::error(
                IssueKind::Io,
                OUTPUT,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        } else if !is_writable(parent) {
            report.push(ValidationIssue::error(
                IssueKind::Io,
                OUTPUT,
                format!("Parent directory is not writable: {}", parent.display()),
            ));
        }

        report
    }

    // ========================================================================
    // TABLE CHECKS
    // ========================================================================

    /// Shared header rules: non-empty, unique, no whitespace
    fn check_header(table: &DataTable, source: &str, report: &mut ValidationReport) {
        let mut seen = HashSet::new();

        for header in &table.headers {
            if header.trim().is_empty() {
                report.push(ValidationIssue::error(
                    IssueKind::Structural,
                    source,
                    "Malformed header: empty column name",
                ));
                continue;
            }
            if !seen.insert(header.as_str()) {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Structural,
                        source,
                        "Malformed header: duplicate column name",
                    )
                    .in_column(header.as_str()),
                );
            }
        }
    }

    /// Every row needs one cell per header column
    fn check_row_widths(table: &DataTable, source: &str, report: &mut ValidationReport) {
        let width = table.headers.len();
        for row in &table.rows {
            if row.values.len() != width {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Structural,
                        source,
                        format!("Expected {} fields, found {}", width, row.values.len()),
                    )
                    .at_row(row.line),
                );
            }
        }
    }

    pub fn validate_data(&self, table: &DataTable) -> ValidationReport {
        let mut report = ValidationReport::new();

        if table.headers.is_empty() || table.is_empty() {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                DATA,
                "Data file is empty",
            ));
            return report;
        }

        Self::check_header(table, DATA, &mut report);

        if !table.has_column(NAME_COLUMN) {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                DATA,
                "Data file must contain a 'name' column",
            ));
        }

        if table.has_column(TRANSCRIPT_COLUMN) {
            report.push(
                ValidationIssue::error(
                    IssueKind::Structural,
                    DATA,
                    "'transcript' is reserved for output and cannot be a data column",
                )
                .in_column(TRANSCRIPT_COLUMN),
            );
        }

        let accolades = table.accolade_columns();
        if accolades.is_empty() {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                DATA,
                format!(
                    "Data file must contain at least one accolade column (prefix: '{}')",
                    ACCOLADE_PREFIX
                ),
            ));
        }

        for header in &table.headers {
            if header.chars().any(char::is_whitespace) {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Value,
                        DATA,
                        "Column names must not contain whitespace",
                    )
                    .in_column(header.as_str()),
                );
            }
            if header.as_str() == ACCOLADE_PREFIX {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Value,
                        DATA,
                        "Accolade column has no identifier after the prefix",
                    )
                    .in_column(header.as_str()),
                );
            }
        }

        Self::check_row_widths(table, DATA, &mut report);

        let name_index = table.column_index(NAME_COLUMN);
        for row in &table.rows {
            if let Some(i) = name_index {
                if table.cell(row, i).trim().is_empty() {
                    report.push(
                        ValidationIssue::error(IssueKind::Value, DATA, "Name must not be empty")
                            .at_row(row.line)
                            .in_column(NAME_COLUMN),
                    );
                }
            }

            for column in &accolades {
                let Some(i) = table.column_index(column) else {
                    continue;
                };
                let value = table.cell(row, i);
                if !is_flag(value) {
                    report.push(
                        ValidationIssue::error(
                            IssueKind::Value,
                            DATA,
                            format!("Invalid value '{}'. Must be 'yes' or 'no'", value),
                        )
                        .at_row(row.line)
                        .in_column(*column),
                    );
                }
            }
        }

        report
    }

    /// Writeups table rules; the index comes back when duplicates allow one
    pub fn validate_writeups(&self, table: &DataTable) -> (ValidationReport, Option<WriteupIndex>) {
        let mut report = ValidationReport::new();

        if table.headers.is_empty() || table.is_empty() {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                WRITEUPS,
                "Writeups file is empty",
            ));
            return (report, None);
        }

        Self::check_header(table, WRITEUPS, &mut report);

        let missing: Vec<&str> = [ACCOLADE_COLUMN, WRITEUP_COLUMN]
            .into_iter()
            .filter(|c| !table.has_column(c))
            .collect();
        if !missing.is_empty() {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                WRITEUPS,
                format!("Writeups file missing required columns: {}", missing.join(", ")),
            ));
            return (report, None);
        }

        Self::check_row_widths(table, WRITEUPS, &mut report);

        let rows = writeup_rows(table).unwrap_or_default();
        for row in &rows {
            if row.accolade.trim().is_empty() {
                report.push(
                    ValidationIssue::error(IssueKind::Value, WRITEUPS, "Empty accolade name")
                        .at_row(row.line)
                        .in_column(ACCOLADE_COLUMN),
                );
            }
            if row.writeup.trim().is_empty() {
                report.push(
                    ValidationIssue::error(IssueKind::Value, WRITEUPS, "Empty writeup template")
                        .at_row(row.line)
                        .in_column(WRITEUP_COLUMN),
                );
            }
        }

        let named: Vec<_> = rows
            .into_iter()
            .filter(|r| !r.accolade.trim().is_empty())
            .collect();
        match WriteupIndex::build(&named) {
            Ok(index) => (report, Some(index)),
            Err(duplicates) => {
                report.extend(duplicates);
                (report, None)
            }
        }
    }

    /// Data ↔ writeups: every used accolade resolves; used writeups only name real columns
    pub fn cross_check(&self, data: &DataTable, index: &WriteupIndex) -> ValidationReport {
        let mut report = ValidationReport::new();

        for column in data.accolade_columns() {
            // Strip once only: `holds` reads `accolade_<entry id>`
            let id = column.strip_prefix(ACCOLADE_PREFIX).unwrap_or(column);
            let Some(entry) = index.get(column) else {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Reference,
                        DATA,
                        format!("Accolade '{}' has no entry in the writeups file", id),
                    )
                    .in_column(column),
                );
                continue;
            };

            for field in placeholder_names(&entry.writeup, Syntax::Dollar) {
                if data.has_column(&field) {
                    continue;
                }
                let message = format!(
                    "Writeup for '{}' references undefined variable '{}'",
                    entry.accolade, field
                );
                let issue = match self.policy {
                    MissingVariablePolicy::Fail => {
                        ValidationIssue::error(IssueKind::Reference, WRITEUPS, message)
                    }
                    MissingVariablePolicy::Literal => {
                        ValidationIssue::warning(IssueKind::Reference, WRITEUPS, message)
                    }
                };
                report.push(issue.at_row(entry.line).in_column(WRITEUP_COLUMN));
            }
        }

        report
    }

    /// Template must carry `{{transcript}}`; other placeholders should name data columns
    pub fn validate_template(&self, template: &DocxTemplate, data: &DataTable) -> ValidationReport {
        let mut report = ValidationReport::new();

        let names = match template.placeholder_names() {
            Ok(names) => names,
            Err(err) => {
                report.push(ValidationIssue::error(
                    IssueKind::Structural,
                    TEMPLATE,
                    format!("Error processing template file: {}", err),
                ));
                return report;
            }
        };

        if !names.iter().any(|n| n == TRANSCRIPT_COLUMN) {
            report.push(ValidationIssue::error(
                IssueKind::Structural,
                TEMPLATE,
                "Template missing transcript insertion ({{transcript}})",
            ));
        }

        let known: HashSet<String> = data.headers.iter().map(|h| h.to_lowercase()).collect();
        for name in names.iter().filter(|n| n.as_str() != TRANSCRIPT_COLUMN) {
            if !known.contains(name) {
                report.push(ValidationIssue::warning(
                    IssueKind::Reference,
                    TEMPLATE,
                    format!("Placeholder {{{{{}}}}} matches no data column and will be left as-is", name),
                ));
            }
        }

        report
    }

    // ========================================================================
    // ENTRY POINT
    // ========================================================================

    /// Run every table check; Err carries all errors, Ok carries the normalized input
    pub fn validate(
        &self,
        data: &DataTable,
        writeups: &DataTable,
        template: Option<&DocxTemplate>,
    ) -> Result<ValidatedInput> {
        let mut report = self.validate_data(data);
        let data_ok = !report.has_errors();

        let (writeup_report, index) = self.validate_writeups(writeups);
        report.extend(writeup_report);

        if let (true, Some(index)) = (data_ok, index.as_ref()) {
            report.extend(self.cross_check(data, index));
        }

        if let Some(template) = template {
            report.extend(self.validate_template(template, data));
        }

        let report = report.into_result()?;
        let index = index.unwrap_or_default();

        let records = data
            .rows
            .iter()
            .map(|row| PersonnelRecord::from_row(&data.headers, row))
            .collect();

        Ok(ValidatedInput {
            headers: data.headers.clone(),
            records,
            index,
            report,
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Severity, TranscriptError};
    use crate::export::docx::test_docx;
    use std::fs;

    fn table(csv: &str) -> DataTable {
        DataTable::from_reader(csv.as_bytes()).unwrap()
    }

    fn writeups() -> DataTable {
        table("accolade,writeup\npunctual,Worked ${hours} hours reliably.\nmentor,Mentored others.\n")
    }

    fn data() -> DataTable {
        table("name,accolade_punctual,accolade_mentor,hours\nAlice,yes,no,40\nBob,NO,Yes,35\n")
    }

    fn issues_of(result: Result<ValidatedInput>) -> Vec<ValidationIssue> {
        match result {
            Err(TranscriptError::Validation(report)) => report.issues,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected validation failure"),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let validated = Validator::new().validate(&data(), &writeups(), None).unwrap();

        assert_eq!(validated.records.len(), 2);
        assert_eq!(validated.records[0].name(), "Alice");
        assert_eq!(validated.index.len(), 2);
        assert!(validated.report.is_empty());
    }

    #[test]
    fn test_missing_name_column_rejected() {
        let data = table("person,accolade_punctual,hours\nAlice,yes,40\n");

        let issues = issues_of(Validator::new().validate(&data, &writeups(), None));

        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::Structural && i.message.contains("'name'")));
    }

    #[test]
    fn test_missing_accolade_columns_rejected() {
        let data = table("name,hours\nAlice,40\n");

        let issues = issues_of(Validator::new().validate(&data, &writeups(), None));

        assert!(issues.iter().any(|i| i.message.contains("at least one accolade")));
    }

    #[test]
    fn test_empty_data_rejected() {
        let report = Validator::new().validate_data(&table("name,accolade_a\n"));

        assert!(report.has_errors());
        assert!(report.issues[0].message.contains("empty"));
    }

    #[test]
    fn test_invalid_flag_reports_row_and_column() {
        let data = table("name,accolade_punctual,hours\nAlice,yes,40\nBob,maybe,35\nCarol,,1\n");

        let report = Validator::new().validate_data(&data);
        let flagged: Vec<_> = report.errors().collect();

        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].row, Some(3));
        assert_eq!(flagged[0].column.as_deref(), Some("accolade_punctual"));
        assert_eq!(flagged[1].row, Some(4));
    }

    #[test]
    fn test_whitespace_in_column_name_rejected() {
        let data = table("name,accolade_on time,total hours\nAlice,yes,40\n");

        let report = Validator::new().validate_data(&data);
        let columns: Vec<_> = report
            .errors()
            .filter(|i| i.kind == IssueKind::Value)
            .filter_map(|i| i.column.clone())
            .collect();

        assert_eq!(columns, vec!["accolade_on time", "total hours"]);
    }

    #[test]
    fn test_empty_name_and_short_row() {
        let data = table("name,accolade_punctual,hours\n,yes,40\nBob,no\n");

        let report = Validator::new().validate_data(&data);

        assert!(report
            .errors()
            .any(|i| i.row == Some(2) && i.column.as_deref() == Some("name")));
        assert!(report
            .errors()
            .any(|i| i.row == Some(3) && i.kind == IssueKind::Structural));
    }

    #[test]
    fn test_reserved_transcript_column() {
        let data = table("name,accolade_a,transcript\nAlice,yes,x\n");

        let report = Validator::new().validate_data(&data);

        assert!(report
            .errors()
            .any(|i| i.column.as_deref() == Some("transcript")));
    }

    #[test]
    fn test_duplicate_writeup_rejected() {
        let dupes = table("accolade,writeup\npunctual,One.\npunctual,Two.\n");

        let issues = issues_of(Validator::new().validate(&data(), &dupes, None));

        let duplicate = issues
            .iter()
            .find(|i| i.message.contains("Duplicate accolade 'punctual'"))
            .unwrap();
        assert_eq!(duplicate.kind, IssueKind::Value);
        assert_eq!(duplicate.row, Some(3));
        // Reported once, by the index
        assert_eq!(
            issues.iter().filter(|i| i.message.contains("Duplicate")).count(),
            1
        );
    }

    #[test]
    fn test_writeups_missing_columns_and_empty_values() {
        let (report, index) = Validator::new().validate_writeups(&table("accolade\npunctual\n"));
        assert!(index.is_none());
        assert!(report.issues[0].message.contains("writeup"));

        let (report, _) =
            Validator::new().validate_writeups(&table("accolade,writeup\n,Text.\nmentor,  \n"));
        let rows: Vec<_> = report.errors().map(|i| (i.row, i.column.clone())).collect();
        assert_eq!(
            rows,
            vec![
                (Some(2), Some("accolade".to_string())),
                (Some(3), Some("writeup".to_string())),
            ]
        );
    }

    #[test]
    fn test_accolade_absent_from_writeups_is_fatal() {
        let only_punctual = table("accolade,writeup\npunctual,On time.\n");

        let issues = issues_of(Validator::new().validate(&data(), &only_punctual, None));

        let missing = issues
            .iter()
            .find(|i| i.kind == IssueKind::Reference)
            .unwrap();
        assert_eq!(missing.column.as_deref(), Some("accolade_mentor"));
    }

    #[test]
    fn test_accolade_prefix_stripped_once() {
        let data = table("name,accolade_accolade_x\nAlice,yes\n");

        let bare = table("accolade,writeup\nx,Did x.\n");
        let issues = issues_of(Validator::new().validate(&data, &bare, None));
        assert!(issues.iter().any(|i| i.kind == IssueKind::Reference
            && i.column.as_deref() == Some("accolade_accolade_x")));

        let prefixed = table("accolade,writeup\naccolade_accolade_x,Did x.\n");
        let validated = Validator::new().validate(&data, &prefixed, None).unwrap();
        let entry = &validated.index.entries()[0];
        assert_eq!(entry.accolade, "accolade_x");
        assert!(validated.records[0].holds(&entry.accolade));
    }

    #[test]
    fn test_unused_writeup_is_allowed() {
        let extra = table(
            "accolade,writeup\npunctual,On time.\nmentor,Mentored.\nhero,Saved ${nobody}.\n",
        );

        assert!(Validator::new().validate(&data(), &extra, None).is_ok());
    }

    #[test]
    fn test_undefined_writeup_variable_policy() {
        let writeups = table("accolade,writeup\npunctual,Rank ${rank}.\nmentor,Mentored.\n");

        let issues = issues_of(Validator::new().validate(&data(), &writeups, None));
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::Reference && i.message.contains("'rank'")));

        let validated = Validator::new()
            .with_policy(MissingVariablePolicy::Literal)
            .validate(&data(), &writeups, None)
            .unwrap();
        assert_eq!(validated.report.issues.len(), 1);
        assert_eq!(validated.report.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_template_missing_transcript_rejected() {
        let template = DocxTemplate::from_bytes(
            "t.docx",
            test_docx(&["<w:r><w:t>Dear {{name}}</w:t></w:r>"]),
        )
        .unwrap();

        let issues = issues_of(Validator::new().validate(&data(), &writeups(), Some(&template)));

        assert!(issues
            .iter()
            .any(|i| i.source == "template" && i.kind == IssueKind::Structural));
    }

    #[test]
    fn test_template_unknown_placeholder_warns() {
        let template = DocxTemplate::from_bytes(
            "t.docx",
            test_docx(&["<w:r><w:t>{{Name}} {{rank}} {{transcript}}</w:t></w:r>"]),
        )
        .unwrap();

        let validated = Validator::new()
            .validate(&data(), &writeups(), Some(&template))
            .unwrap();

        let warnings: Vec<_> = validated.report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("{{rank}}"));
    }

    #[test]
    fn test_check_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("data.CSV");
        let txt = dir.path().join("data.txt");
        fs::write(&csv, "name\n").unwrap();
        fs::write(&txt, "name\n").unwrap();

        assert!(Validator::check_input_file(&csv, DATA, "csv").is_empty());
        assert!(Validator::check_input_file(&txt, DATA, "csv").has_errors());
        assert!(Validator::check_input_file(&dir.path().join("nope.csv"), DATA, "csv").has_errors());
    }

    #[test]
    fn test_writable_means_a_file_can_be_created() {
        let dir = tempfile::tempdir().unwrap();

        assert!(is_writable(dir.path()));
        assert!(!is_writable(&dir.path().join("missing")));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_check_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(Validator::check_output_dir(dir.path()).is_empty());
        assert!(Validator::check_output_dir(&dir.path().join("new")).is_empty());
        assert!(Validator::check_output_dir(&file).has_errors());
        assert!(Validator::check_output_dir(&dir.path().join("a").join("b")).has_errors());
    }
}
