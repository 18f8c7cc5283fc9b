// CSV exporter: original columns + `transcript`, one file per run

use super::{ExportOutcome, Exporter, OutputType};
use crate::assembler::AssembledRecord;
use crate::error::{Result, TranscriptError};
use crate::table::TRANSCRIPT_COLUMN;
use csv::WriterBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct CsvExporter {
    output_dir: PathBuf,
    stamp: String,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        CsvExporter {
            output_dir: output_dir.into(),
            stamp: stamp.into(),
        }
    }

    /// `<output_dir>/transcripts_<stamp>.csv`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("transcripts_{}.csv", self.stamp))
    }

    fn write(&self, path: &Path, headers: &[String], batch: &[AssembledRecord]) -> csv::Result<()> {
        let mut writer = WriterBuilder::new().from_path(path)?;

        let mut header: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
        header.push(TRANSCRIPT_COLUMN);
        writer.write_record(&header)?;

        for item in batch {
            let mut row: Vec<&str> = headers
                .iter()
                .map(|h| item.record.get(h).unwrap_or(""))
                .collect();
            row.push(&item.transcript.text);
            writer.write_record(&row)?;
            debug!(name = item.record.name(), "wrote CSV row");
        }

        writer.flush()?;
        Ok(())
    }
}

impl Exporter for CsvExporter {
    fn export(&self, headers: &[String], batch: &[AssembledRecord]) -> Result<ExportOutcome> {
        let path = self.output_path();

        self.write(&path, headers, batch)
            .map_err(|e| TranscriptError::csv(&path, e))?;

        info!(rows = batch.len(), path = %path.display(), "CSV transcripts exported");

        Ok(ExportOutcome { files: vec![path] })
    }

    fn output_type(&self) -> OutputType {
        OutputType::Csv
    }
}
