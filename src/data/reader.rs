//! Annotated-corpus file readers.
//!
//! The corpus comes as two TSV files. The document file holds one document
//! per line: `docno<TAB>text`. The annotation file holds one annotation per
//! line: `docno<TAB>label<TAB>annot_id<TAB>parent_id<TAB>start<TAB>length`,
//! with offsets counted in characters. Blank lines and lines starting with
//! `#` are skipped in both files.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::index::memory::Annotation;
use crate::types::ElementSpan;

/// One annotation row from the annotation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationEntry {
    pub docno: String,
    pub label: String,
    pub annot_id: u32,
    pub parent_id: u32,
    pub start: u32,
    pub len: u32,
}

impl AnnotationEntry {
    /// Convert to the indexable form; the end offset points at the last
    /// covered character (zero-length annotations collapse onto `start`).
    pub fn to_annotation(&self) -> Annotation {
        let end = self.start + self.len.saturating_sub(1);
        Annotation {
            label: self.label.clone(),
            span: ElementSpan::annotation(self.annot_id, self.parent_id, self.start, end),
        }
    }
}

/// A document with its annotations, ready for indexing.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    pub docno: String,
    pub text: String,
    pub annotations: Vec<Annotation>,
}

/// Parse the annotation file into per-document entry lists; file order is
/// preserved within each document.
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<AnnotationEntry>>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut by_doc: HashMap<String, Vec<AnnotationEntry>> = HashMap::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = parse_annotation_line(trimmed).map_err(|e| {
            EngineError::Syntax(format!(
                "{}:{}: {e}",
                path.as_ref().display(),
                line_no + 1
            ))
        })?;
        by_doc.entry(entry.docno.clone()).or_default().push(entry);
    }
    Ok(by_doc)
}

fn parse_annotation_line(line: &str) -> std::result::Result<AnnotationEntry, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 6 {
        return Err(format!(
            "expected 6 tab-separated fields, got {}",
            fields.len()
        ));
    }
    let num = |name: &str, value: &str| -> std::result::Result<u32, String> {
        value
            .parse::<u32>()
            .map_err(|_| format!("field '{name}' is not a non-negative integer: '{value}'"))
    };
    Ok(AnnotationEntry {
        docno: fields[0].to_string(),
        label: fields[1].to_string(),
        annot_id: num("annot_id", fields[2])?,
        parent_id: num("parent_id", fields[3])?,
        start: num("start", fields[4])?,
        len: num("length", fields[5])?,
    })
}

/// Streams documents joined with their annotations.
pub struct CorpusReader {
    lines: Lines<BufReader<File>>,
    annotations: HashMap<String, Vec<AnnotationEntry>>,
    line_no: usize,
}

impl CorpusReader {
    /// Open the document file and load the annotation file up front (the
    /// annotation file is the smaller of the two in practice).
    pub fn open<P: AsRef<Path>>(text_path: P, annot_path: P) -> Result<Self> {
        let annotations = read_annotations(annot_path)?;
        let lines = BufReader::new(File::open(text_path.as_ref())?).lines();
        Ok(Self {
            lines,
            annotations,
            line_no: 0,
        })
    }

    fn parse_doc_line(&mut self, line: &str) -> Result<AnnotatedDocument> {
        let (docno, text) = line.split_once('\t').ok_or_else(|| {
            EngineError::Syntax(format!(
                "document line {} has no tab between docno and text",
                self.line_no
            ))
        })?;
        let annotations = self
            .annotations
            .remove(docno)
            .unwrap_or_default()
            .iter()
            .map(AnnotationEntry::to_annotation)
            .collect();
        Ok(AnnotatedDocument {
            docno: docno.to_string(),
            text: text.to_string(),
            annotations,
        })
    }
}

impl Iterator for CorpusReader {
    type Item = Result<AnnotatedDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            let trimmed = line.trim_end();
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(self.parse_doc_line(trimmed));
        }
    }
}
