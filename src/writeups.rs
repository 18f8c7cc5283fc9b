// 📚 Writeup Index - accolade id → writeup template
// Single owner of duplicate-accolade detection

use crate::error::{IssueKind, ValidationIssue, ValidationReport};
use crate::table::{normalize_accolade_id, WriteupRow, ACCOLADE_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteupEntry {
    /// Normalized id (no `accolade_` prefix)
    pub accolade: String,
    /// Template text with `${var}` placeholders
    pub writeup: String,
    /// Line in the writeups file
    pub line: usize,
}

/// Writeups in table order, plus a lookup by id
#[derive(Debug, Clone, Default)]
pub struct WriteupIndex {
    entries: Vec<WriteupEntry>,
    by_id: HashMap<String, usize>,
}

impl WriteupIndex {
    /// Build the index; every repeated id (after normalization) is a ValueError
    pub fn build(rows: &[WriteupRow]) -> Result<Self, ValidationReport> {
        let mut index = WriteupIndex::default();
        let mut report = ValidationReport::new();

        for row in rows {
            let id = normalize_accolade_id(&row.accolade).to_string();

            if let Some(&first) = index.by_id.get(&id) {
                report.push(
                    ValidationIssue::error(
                        IssueKind::Value,
                        "writeups",
                        format!(
                            "Duplicate accolade '{}' (first defined at row {})",
                            id, index.entries[first].line
                        ),
                    )
                    .at_row(row.line)
                    .in_column(ACCOLADE_COLUMN),
                );
                continue;
            }

            index.by_id.insert(id.clone(), index.entries.len());
            index.entries.push(WriteupEntry {
                accolade: id,
                writeup: row.writeup.clone(),
                line: row.line,
            });
        }

        if report.has_errors() {
            Err(report)
        } else {
            Ok(index)
        }
    }

    /// Lookup by id, with or without the `accolade_` prefix
    pub fn get(&self, accolade: &str) -> Option<&WriteupEntry> {
        self.by_id
            .get(normalize_accolade_id(accolade))
            .map(|&i| &self.entries[i])
    }

    pub fn contains(&self, accolade: &str) -> bool {
        self.get(accolade).is_some()
    }

    /// Entries in writeups-table order
    pub fn entries(&self) -> &[WriteupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_lookup() {
        let rows = vec![
            WriteupRow::new(2, "punctual", "Always on time."),
            WriteupRow::new(3, "accolade_mentor", "Mentored ${count} juniors."),
        ];

        let index = WriteupIndex::build(&rows).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("punctual").unwrap().writeup, "Always on time.");
        assert_eq!(index.get("accolade_punctual").unwrap().line, 2);
        assert!(index.contains("mentor"));
        assert!(!index.contains("hero"));
    }

    #[test]
    fn test_entries_keep_table_order() {
        let rows = vec![
            WriteupRow::new(2, "zeta", "Z."),
            WriteupRow::new(3, "alpha", "A."),
        ];

        let index = WriteupIndex::build(&rows).unwrap();
        let ids: Vec<_> = index.entries().iter().map(|e| e.accolade.as_str()).collect();

        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_duplicate_accolade_rejected() {
        let rows = vec![
            WriteupRow::new(2, "punctual", "One."),
            WriteupRow::new(3, "mentor", "Two."),
            WriteupRow::new(4, "punctual", "Three."),
        ];

        let report = WriteupIndex::build(&rows).unwrap_err();

        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.kind, IssueKind::Value);
        assert_eq!(issue.row, Some(4));
        assert!(issue.message.contains("row 2"));
    }

    #[test]
    fn test_prefixed_and_bare_ids_collide() {
        let rows = vec![
            WriteupRow::new(2, "punctual", "One."),
            WriteupRow::new(3, "accolade_punctual", "Two."),
        ];

        assert!(WriteupIndex::build(&rows).is_err());
    }
}
