// 🧩 Transcript Assembler - record + writeup index → transcript
// Pure: no I/O, output depends only on (record, index, options)

use crate::error::{Result, TranscriptError};
use crate::placeholder::{render, MissingVariablePolicy, Syntax};
use crate::table::PersonnelRecord;
use crate::writeups::WriteupIndex;
use serde::{Deserialize, Serialize};

/// Default joiner between resolved writeups
pub const DEFAULT_SEPARATOR: &str = " ";

/// Assembled transcript for one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Resolved writeups, joined
    pub text: String,
    /// Accolade ids that contributed, in writeups-table order
    pub accolades: Vec<String>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A record paired with its transcript, ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledRecord {
    pub record: PersonnelRecord,
    pub transcript: Transcript,
}

pub struct TranscriptAssembler<'a> {
    index: &'a WriteupIndex,
    policy: MissingVariablePolicy,
    separator: String,
}

impl<'a> TranscriptAssembler<'a> {
    pub fn new(index: &'a WriteupIndex) -> Self {
        TranscriptAssembler {
            index,
            policy: MissingVariablePolicy::Fail,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Builder: what to do with `${var}` naming no column
    pub fn with_policy(mut self, policy: MissingVariablePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder: joiner between writeups
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Build one transcript
    ///
    /// Walks the writeups in table order, keeps those whose `accolade_<id>`
    /// field is `yes`, substitutes `${field}` from any column of the record.
    pub fn assemble(&self, record: &PersonnelRecord) -> Result<Transcript> {
        let mut parts = Vec::new();
        let mut accolades = Vec::new();

        for entry in self.index.entries() {
            if !record.holds(&entry.accolade) {
                continue;
            }

            let section = render(&entry.writeup, Syntax::Dollar, self.policy, |field| {
                record.get(field)
            })
            .map_err(|unresolved| TranscriptError::Substitution {
                row: record.line(),
                accolade: entry.accolade.clone(),
                field: unresolved.name,
            })?;

            parts.push(section);
            accolades.push(entry.accolade.clone());
        }

        Ok(Transcript {
            text: parts.join(&self.separator),
            accolades,
        })
    }

    /// Assemble every record, stopping at the first substitution failure
    pub fn assemble_all(&self, records: &[PersonnelRecord]) -> Result<Vec<AssembledRecord>> {
        records
            .iter()
            .map(|record| {
                Ok(AssembledRecord {
                    record: record.clone(),
                    transcript: self.assemble(record)?,
                })
            })
            .collect()
    }
}
