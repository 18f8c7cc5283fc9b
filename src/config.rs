// ⚙️ Generation Config - one explicit value handed to the pipeline
// Loadable from JSON; command-line flags layer on top

use crate::assembler::DEFAULT_SEPARATOR;
use crate::error::{Result, TranscriptError};
use crate::export::OutputType;
use crate::placeholder::MissingVariablePolicy;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// CSV with `name`, `accolade_*` and variable columns
    pub data_path: PathBuf,

    /// CSV with `accolade` and `writeup` columns
    pub writeups_path: PathBuf,

    #[serde(default)]
    pub output_type: OutputType,

    /// Where output goes; see `resolved_output_dir`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Required iff `output_type` is docx
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    #[serde(default)]
    pub missing_variable: MissingVariablePolicy,

    /// Joiner between writeups inside one transcript
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Suffix for output names; local `%Y%m%d_%H%M%S` when absent
    #[serde(default)]
    pub file_stamp: Option<String>,
}

impl GenerationConfig {
    pub fn new(data_path: impl Into<PathBuf>, writeups_path: impl Into<PathBuf>) -> Self {
        GenerationConfig {
            data_path: data_path.into(),
            writeups_path: writeups_path.into(),
            output_type: OutputType::Csv,
            output_dir: None,
            template_path: None,
            missing_variable: MissingVariablePolicy::Fail,
            separator: default_separator(),
            file_stamp: None,
        }
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TranscriptError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            TranscriptError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Builder: DOCX output from a template
    pub fn with_docx_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.output_type = OutputType::Docx;
        self.template_path = Some(template.into());
        self
    }

    /// Builder: output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builder: fixed file stamp
    pub fn with_file_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.file_stamp = Some(stamp.into());
        self
    }

    /// Builder: missing-variable policy
    pub fn with_missing_variable(mut self, policy: MissingVariablePolicy) -> Self {
        self.missing_variable = policy;
        self
    }

    /// Shape checks that need no file access
    pub fn check(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() || self.writeups_path.as_os_str().is_empty() {
            return Err(TranscriptError::Config(
                "both a data file and a writeups file are required".to_string(),
            ));
        }

        match (self.output_type, &self.template_path) {
            (OutputType::Docx, None) => Err(TranscriptError::Config(
                "a template file is required for DOCX output".to_string(),
            )),
            (OutputType::Csv, Some(_)) => Err(TranscriptError::Config(
                "a template file only applies to DOCX output".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Stamp for this run's output names
    pub fn stamp(&self) -> String {
        self.file_stamp
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Explicit dir, else the current dir for CSV and `./transcripts_<stamp>` for DOCX
    pub fn resolved_output_dir(&self, stamp: &str) -> PathBuf {
        match (&self.output_dir, self.output_type) {
            (Some(dir), _) => dir.clone(),
            (None, OutputType::Csv) => PathBuf::from("."),
            (None, OutputType::Docx) => PathBuf::from(format!("transcripts_{}", stamp)),
        }
    }
}
