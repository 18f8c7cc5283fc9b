// 🔁 Pipeline - validate → index → assemble → export
// The only entry point the command and interactive surfaces call

use crate::assembler::TranscriptAssembler;
use crate::config::GenerationConfig;
use crate::error::{Result, TranscriptError, ValidationIssue, ValidationReport};
use crate::export::{CsvExporter, DocxExporter, DocxTemplate, Exporter, OutputType};
use crate::table::DataTable;
use crate::validator::Validator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// What one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub output_type: OutputType,
    pub output_dir: PathBuf,
    pub records: usize,
    /// Records whose transcript is non-empty
    pub with_accolades: usize,
    pub files: Vec<PathBuf>,
    pub warnings: Vec<ValidationIssue>,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} transcript(s) for {} record(s) ({} with accolades) → {} file(s) in {}",
            self.output_type,
            self.records,
            self.with_accolades,
            self.files.len(),
            self.output_dir.display()
        )
    }
}

/// File-level checks before any parsing: inputs exist with the right type, output is usable
fn preflight(config: &GenerationConfig, output_dir: &std::path::Path) -> Result<()> {
    let mut report = ValidationReport::new();

    report.extend(Validator::check_input_file(&config.data_path, "data", "csv"));
    report.extend(Validator::check_input_file(
        &config.writeups_path,
        "writeups",
        "csv",
    ));
    if let Some(template) = &config.template_path {
        report.extend(Validator::check_input_file(template, "template", "docx"));
    }
    report.extend(Validator::check_output_dir(output_dir));

    report.into_result().map(|_| ())
}

/// Run the whole generation for one configuration
pub fn run(config: &GenerationConfig) -> Result<RunSummary> {
    config.check()?;

    let stamp = config.stamp();
    let output_dir = config.resolved_output_dir(&stamp);
    preflight(config, &output_dir)?;

    let data = DataTable::from_path(&config.data_path)?;
    let writeups = DataTable::from_path(&config.writeups_path)?;
    info!(
        records = data.len(),
        writeups = writeups.len(),
        "inputs loaded"
    );

    let template = match (config.output_type, &config.template_path) {
        (OutputType::Docx, Some(path)) => Some(DocxTemplate::open(path)?),
        _ => None,
    };

    let validated = Validator::new()
        .with_policy(config.missing_variable)
        .validate(&data, &writeups, template.as_ref())?;
    for issue in validated.report.warnings() {
        warn!("{}", issue);
    }

    let assembled = TranscriptAssembler::new(&validated.index)
        .with_policy(config.missing_variable)
        .with_separator(config.separator.clone())
        .assemble_all(&validated.records)?;

    fs::create_dir_all(&output_dir).map_err(|e| TranscriptError::io(&output_dir, e))?;

    let exporter: Box<dyn Exporter> = match template {
        Some(template) => Box::new(DocxExporter::new(template, &output_dir, &stamp)?),
        None => Box::new(CsvExporter::new(&output_dir, &stamp)),
    };
    let outcome = exporter.export(&validated.headers, &assembled)?;

    let summary = RunSummary {
        output_type: exporter.output_type(),
        output_dir,
        records: assembled.len(),
        with_accolades: assembled.iter().filter(|a| !a.transcript.is_empty()).count(),
        files: outcome.files,
        warnings: validated.report.warnings().cloned().collect(),
    };
    info!("{}", summary.summary());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;
    use crate::export::docx::test_docx;
    use crate::placeholder::MissingVariablePolicy;
    use std::io::Read;
    use std::path::Path;

    const DATA: &str = "name,accolade_punctual,accolade_mentor,hours\n\
                        Alice,yes,no,40\n\
                        Bob,no,no,35\n\
                        Carol,Yes,YES,50\n";
    const WRITEUPS: &str = "accolade,writeup\n\
                            mentor,${name} mentored two juniors.\n\
                            punctual,Worked ${hours} hours reliably.\n";

    fn write_inputs(dir: &Path, data: &str, writeups: &str) -> GenerationConfig {
        let data_path = dir.join("data.csv");
        let writeups_path = dir.join("writeups.csv");
        fs::write(&data_path, data).unwrap();
        fs::write(&writeups_path, writeups).unwrap();
        GenerationConfig::new(data_path, writeups_path)
            .with_output_dir(dir.join("out"))
            .with_file_stamp("test")
    }

    #[test]
    fn test_csv_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), DATA, WRITEUPS);

        let summary = run(&config).unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.with_accolades, 2);
        assert_eq!(summary.files, vec![dir.path().join("out").join("transcripts_test.csv")]);

        let out = DataTable::from_path(&summary.files[0]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.headers.last().unwrap(), "transcript");
        assert_eq!(out.rows[0].values[4], "Worked 40 hours reliably.");
        assert_eq!(out.rows[1].values[4], "");
        // Writeups order: mentor before punctual
        assert_eq!(
            out.rows[2].values[4],
            "Carol mentored two juniors. Worked 50 hours reliably."
        );
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), DATA, WRITEUPS);

        let first = fs::read(&run(&config).unwrap().files[0]).unwrap();
        let second = fs::read(&run(&config).unwrap().files[0]).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(
            dir.path(),
            "person,accolade_punctual\nAlice,yes\n",
            "accolade,writeup\npunctual,On time.\npunctual,Again.\n",
        );

        let err = run(&config).unwrap_err();

        let report = err.report().unwrap();
        assert!(report.errors().any(|i| i.message.contains("'name'")));
        assert!(report.errors().any(|i| i.message.contains("Duplicate")));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_input_file_is_io_issue() {
        let dir = tempfile::tempdir().unwrap();
        let config = GenerationConfig::new(dir.path().join("nope.csv"), dir.path().join("w.csv"));

        let err = run(&config).unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.errors().count(), 2);
        assert!(report.errors().all(|i| i.kind == IssueKind::Io));
    }

    #[test]
    fn test_literal_policy_keeps_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(
            dir.path(),
            "name,accolade_punctual\nAlice,yes\n",
            "accolade,writeup\npunctual,Rank ${rank}.\n",
        )
        .with_missing_variable(MissingVariablePolicy::Literal);

        let summary = run(&config).unwrap();

        assert_eq!(summary.warnings.len(), 1);
        let out = DataTable::from_path(&summary.files[0]).unwrap();
        assert_eq!(out.rows[0].values[2], "Rank ${rank}.");
    }

    #[test]
    fn test_docx_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        fs::write(
            &template_path,
            test_docx(&[
                "<w:r><w:t>Transcript for {{name}}</w:t></w:r>",
                "<w:r><w:t>{{transcript}}</w:t></w:r>",
            ]),
        )
        .unwrap();
        let config =
            write_inputs(dir.path(), DATA, WRITEUPS).with_docx_template(&template_path);

        let summary = run(&config).unwrap();

        assert_eq!(summary.files.len(), 3);
        assert_eq!(
            summary.files[2].file_name().unwrap(),
            "transcript_Carol_test.docx"
        );

        let bytes = fs::read(&summary.files[0]).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("Transcript for Alice"));
        assert!(xml.contains("Worked 40 hours reliably."));
    }

    #[test]
    fn test_docx_template_without_transcript_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.docx");
        fs::write(
            &template_path,
            test_docx(&["<w:r><w:t>Dear {{name}}</w:t></w:r>"]),
        )
        .unwrap();
        let config =
            write_inputs(dir.path(), DATA, WRITEUPS).with_docx_template(&template_path);

        let err = run(&config).unwrap_err();

        assert!(err.report().is_some());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_docx_without_template_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), DATA, WRITEUPS);
        config.output_type = OutputType::Docx;

        assert!(matches!(run(&config), Err(TranscriptError::Config(_))));
    }
}
