// DOCX exporter: clone the template archive per person, resolve `{{var}}`
//
// A .docx is a zip of XML parts. Placeholders live in `<w:t>` text nodes of
// the body, headers and footers. Word freely splits one visible string over
// several runs, so matching is done on the joined text of each paragraph and
// the result is written back into the runs.

use super::{ExportOutcome, Exporter, OutputType};
use crate::assembler::AssembledRecord;
use crate::error::{Result, TranscriptError};
use crate::placeholder::{scan, Segment, Syntax};
use crate::table::TRANSCRIPT_COLUMN;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

static TEXT_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^word/(document|header\d*|footer\d*)\.xml$").expect("valid regex")
});
// Paragraph open/close tags and text nodes; `<w:pPr>` and `<w:tab/>` don't match
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:p(?:\s[^>]*)?>|</w:p>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid regex")
});

// ============================================================================
// TEMPLATE
// ============================================================================

#[derive(Debug, Clone)]
struct ArchiveEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// A loaded DOCX template; read-only, rendered into fresh copies
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl DocxTemplate {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| TranscriptError::io(path, e))?;
        Self::from_bytes(path, bytes)
    }

    /// `path` is only used in messages
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| TranscriptError::zip(&path, e))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| TranscriptError::zip(&path, e))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| TranscriptError::io(&path, e))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                data,
                is_dir: file.is_dir(),
            });
        }

        if !entries.iter().any(|e| e.name == "word/document.xml") {
            return Err(TranscriptError::Template(format!(
                "{} is not a Word document (no word/document.xml)",
                path.display()
            )));
        }

        Ok(DocxTemplate { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn text_parts(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir && TEXT_PART_RE.is_match(&e.name))
    }

    fn part_xml<'a>(&self, entry: &'a ArchiveEntry) -> Result<&'a str> {
        std::str::from_utf8(&entry.data).map_err(|_| {
            TranscriptError::Template(format!(
                "{}: part {} is not valid UTF-8",
                self.path.display(),
                entry.name
            ))
        })
    }

    /// Distinct `{{var}}` names (lower-cased) across body, headers and footers
    pub fn placeholder_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();

        for entry in self.text_parts() {
            let xml = self.part_xml(entry)?;
            for paragraph in paragraphs(xml) {
                let text: String = paragraph.iter().map(|node| node.text.as_str()).collect();
                for segment in scan(&text, Syntax::Braces) {
                    if let Segment::Placeholder { name, .. } = segment {
                        let name = name.to_lowercase();
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
            }
        }

        Ok(names)
    }

    pub fn has_placeholder(&self, name: &str) -> Result<bool> {
        let name = name.to_lowercase();
        Ok(self.placeholder_names()?.iter().any(|n| *n == name))
    }

    /// Render a populated copy as DOCX bytes
    ///
    /// `values` is keyed by lower-cased variable name. Unknown placeholders stay literal.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .map_err(|e| TranscriptError::zip(&self.path, e))?;
                continue;
            }

            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| TranscriptError::zip(&self.path, e))?;

            let written = if TEXT_PART_RE.is_match(&entry.name) {
                let xml = render_part(self.part_xml(entry)?, values);
                writer.write_all(xml.as_bytes())
            } else {
                writer.write_all(&entry.data)
            };
            written.map_err(|e| TranscriptError::io(&self.path, e))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| TranscriptError::zip(&self.path, e))?;
        Ok(cursor.into_inner())
    }
}

// ============================================================================
// XML TEXT HANDLING
// ============================================================================

/// One `<w:t>` node: its byte span in the part and its unescaped text
#[derive(Debug)]
struct TextNode {
    span: Range<usize>,
    text: String,
}

/// Text nodes grouped by the paragraph that directly contains them
///
/// Paragraphs nest (a textbox inside a run holds its own `<w:p>`), so tags are
/// tracked with a stack. Groups are in order of each paragraph's opening tag.
fn paragraphs(xml: &str) -> Vec<Vec<TextNode>> {
    let mut groups: Vec<Vec<TextNode>> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for caps in MARKUP_RE.captures_iter(xml) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let tag = whole.as_str();

        if let Some(text) = caps.get(1) {
            if let Some(&group) = open.last() {
                groups[group].push(TextNode {
                    span: whole.range(),
                    text: xml_unescape(text.as_str()),
                });
            }
        } else if tag == "</w:p>" {
            open.pop();
        } else if !tag.ends_with("/>") {
            open.push(groups.len());
            groups.push(Vec::new());
        }
    }

    groups
}

fn render_part(xml: &str, values: &HashMap<String, String>) -> String {
    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
    for paragraph in paragraphs(xml) {
        if let Some(outputs) = render_paragraph(&paragraph, values) {
            replacements.extend(paragraph.into_iter().map(|node| node.span).zip(outputs));
        }
    }
    if replacements.is_empty() {
        return xml.to_string();
    }
    replacements.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (span, text) in replacements {
        out.push_str(&xml[cursor..span.start]);
        out.push_str(&format!("<w:t xml:space=\"preserve\">{}</w:t>", xml_escape(&text)));
        cursor = span.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

/// New text for each node of one paragraph, or None when it has no placeholders
///
/// Each placeholder's value lands in the text node where the placeholder
/// starts; the rest of the marker is removed from the following nodes.
fn render_paragraph(nodes: &[TextNode], values: &HashMap<String, String>) -> Option<Vec<String>> {
    let joined: String = nodes.iter().map(|node| node.text.as_str()).collect();
    let segments = scan(&joined, Syntax::Braces);
    if !segments
        .iter()
        .any(|s| matches!(s, Segment::Placeholder { .. }))
    {
        return None;
    }

    // Byte ranges of each node inside `joined`
    let mut bounds = Vec::with_capacity(nodes.len());
    let mut start = 0;
    for node in nodes {
        bounds.push((start, start + node.text.len()));
        start += node.text.len();
    }

    let mut outputs = vec![String::new(); nodes.len()];
    let mut offset = 0;
    for segment in segments {
        match segment {
            Segment::Literal(literal) => {
                let end = offset + literal.len();
                for (i, &(node_start, node_end)) in bounds.iter().enumerate() {
                    let from = offset.max(node_start);
                    let to = end.min(node_end);
                    if from < to {
                        outputs[i].push_str(&joined[from..to]);
                    }
                }
                offset = end;
            }
            Segment::Placeholder { name, raw } => {
                let node = bounds
                    .iter()
                    .position(|&(s, e)| s <= offset && offset < e)
                    .unwrap_or(0);
                match values.get(&name.to_lowercase()) {
                    Some(value) => outputs[node].push_str(value),
                    None => outputs[node].push_str(raw),
                }
                offset += raw.len();
            }
        }
    }

    Some(outputs)
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn xml_unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// FILE NAMING
// ============================================================================

/// Filesystem-safe stem from a person's name
///
/// ASCII alphanumerics, `-` and `_` survive; whitespace becomes `_`.
pub fn safe_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Hands out unique stems in call order: `Alice`, `Alice_2`, `Alice_3`, …
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> String {
        let base = safe_file_stem(name);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

// ============================================================================
// EXPORTER
// ============================================================================

pub struct DocxExporter {
    template: DocxTemplate,
    output_dir: PathBuf,
    stamp: String,
}

impl DocxExporter {
    /// Fails if the template has no `{{transcript}}` placeholder
    pub fn new(
        template: DocxTemplate,
        output_dir: impl Into<PathBuf>,
        stamp: impl Into<String>,
    ) -> Result<Self> {
        if !template.has_placeholder(TRANSCRIPT_COLUMN)? {
            return Err(TranscriptError::Template(format!(
                "{} is missing the {{{{{}}}}} placeholder",
                template.path().display(),
                TRANSCRIPT_COLUMN
            )));
        }

        Ok(DocxExporter {
            template,
            output_dir: output_dir.into(),
            stamp: stamp.into(),
        })
    }

    /// Template variables for one person: every column (lower-cased) + transcript
    fn context(item: &AssembledRecord) -> HashMap<String, String> {
        let mut values: HashMap<String, String> = item
            .record
            .fields()
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        values.insert(TRANSCRIPT_COLUMN.to_string(), item.transcript.text.clone());
        values
    }
}

impl Exporter for DocxExporter {
    fn export(&self, _headers: &[String], batch: &[AssembledRecord]) -> Result<ExportOutcome> {
        let mut namer = FileNamer::new();
        let mut files = Vec::with_capacity(batch.len());

        for item in batch {
            let stem = namer.claim(item.record.name());
            let path = self
                .output_dir
                .join(format!("transcript_{}_{}.docx", stem, self.stamp));

            let written = self
                .template
                .render(&Self::context(item))
                .and_then(|bytes| fs::write(&path, bytes).map_err(|e| TranscriptError::io(&path, e)));

            if let Err(err) = written {
                error!(
                    name = item.record.name(),
                    row = item.record.line(),
                    "failed to write document: {}",
                    err
                );
                return Err(err);
            }

            debug!(path = %path.display(), "wrote document");
            files.push(path);
        }

        info!(
            documents = files.len(),
            dir = %self.output_dir.display(),
            "DOCX transcripts exported"
        );

        Ok(ExportOutcome { files })
    }

    fn output_type(&self) -> OutputType {
        OutputType::Docx
    }
}

/// Minimal Word archive for tests: one paragraph per XML snippet
#[cfg(test)]
pub(crate) fn test_docx<S: AsRef<str>>(paragraphs: &[S]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|runs| format!("<w:p><w:pPr/>{}</w:p>", runs.as_ref()))
        .collect();
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr/></w:body></w:document>",
        body
    );

    test_archive(&[
        ("[Content_Types].xml", "<Types/>"),
        ("word/document.xml", document.as_str()),
    ])
}

/// Zip of the given (part name, content) pairs
#[cfg(test)]
pub(crate) fn test_archive(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
