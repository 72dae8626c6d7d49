//! In-memory positional inverted index with per-position payloads.
//!
//! This is the embedded host the engine runs against: field -> term ->
//! posting list, documents in ascending id order, positions in start-offset
//! order, every position carrying the payload bytes the match engine decodes
//! at query time. Snapshots serialize to JSON so the CLI applications can
//! hand an index from the indexer to the query runner.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::index::postings::{DocId, EmptyCursor, PostingsCursor, NO_MORE_DOCS};
use crate::index::schema::SchemaConfig;
use crate::payload;
use crate::types::ElementSpan;

/// One annotation to index for a document.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub label: String,
    pub span: ElementSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostingPosition {
    pos: u32,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocPosting {
    doc_id: DocId,
    positions: Vec<PostingPosition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PostingList {
    docs: Vec<DocPosting>,
    /// Total occurrences of the term across the index.
    cost: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryIndex {
    schema: SchemaConfig,
    fields: HashMap<String, HashMap<String, PostingList>>,
    docnos: Vec<String>,
}

impl MemoryIndex {
    fn new(schema: SchemaConfig) -> Result<Self> {
        schema.validate()?;
        Ok(Self {
            schema,
            fields: HashMap::new(),
            docnos: Vec::new(),
        })
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    pub fn num_docs(&self) -> usize {
        self.docnos.len()
    }

    /// External document number for an internal doc id.
    pub fn docno(&self, doc_id: DocId) -> Option<&str> {
        self.docnos.get(doc_id as usize).map(String::as_str)
    }

    /// Open a posting cursor for a term; terms absent from the index get an
    /// immediately exhausted cursor.
    pub fn open_cursor<'a>(&'a self, field: &str, term: &str) -> Box<dyn PostingsCursor + 'a> {
        match self.fields.get(field).and_then(|terms| terms.get(term)) {
            Some(list) => Box::new(MemoryPostingsCursor::new(list)),
            None => Box::new(EmptyCursor),
        }
    }

    /// Write a JSON snapshot of the index.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!(
            "saved index snapshot: {} docs, {} fields",
            self.num_docs(),
            self.fields.len()
        );
        Ok(())
    }

    /// Load and validate a JSON snapshot.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let index: MemoryIndex = serde_json::from_str(&json)?;
        index.schema.validate()?;
        log::info!("loaded index snapshot with {} docs", index.num_docs());
        Ok(index)
    }
}

/// Builder ingesting annotated documents into a [`MemoryIndex`].
pub struct MemoryIndexWriter {
    index: MemoryIndex,
}

impl MemoryIndexWriter {
    pub fn new(schema: SchemaConfig) -> Result<Self> {
        Ok(Self {
            index: MemoryIndex::new(schema)?,
        })
    }

    /// Index one document: the text field gets whitespace tokens with their
    /// character spans, the annotations field one position per annotation in
    /// start-offset order.
    pub fn add_document(
        &mut self,
        docno: &str,
        text: &str,
        annots: &[Annotation],
    ) -> Result<DocId> {
        if self.index.docnos.len() as u64 >= NO_MORE_DOCS as u64 {
            return Err(EngineError::Invariant(
                "document id space exhausted".to_string(),
            ));
        }
        let doc_id = self.index.docnos.len() as DocId;
        self.index.docnos.push(docno.to_string());

        let text_field = self.index.schema.text_field.clone();
        for (pos, (term, start, end)) in tokenize_with_offsets(text).into_iter().enumerate() {
            let span = ElementSpan::token(start, end);
            let bytes = payload::encode(&span).into_bytes();
            self.push_position(&text_field, &term, doc_id, pos as u32, bytes);
        }

        // Stable sort keeps input order among equal start offsets.
        let annot_field = self.index.schema.annot_field.clone();
        let mut sorted: Vec<&Annotation> = annots.iter().collect();
        sorted.sort_by_key(|a| a.span.start_offset);
        for (pos, annot) in sorted.iter().enumerate() {
            let token = payload::encode_annot_token(&annot.label, &annot.span)?;
            let (term, bytes) = payload::split_token(&token)?;
            let term = term.to_string();
            self.push_position(&annot_field, &term, doc_id, pos as u32, bytes.to_vec());
        }

        Ok(doc_id)
    }

    fn push_position(&mut self, field: &str, term: &str, doc_id: DocId, pos: u32, bytes: Vec<u8>) {
        let list = self
            .index
            .fields
            .entry(field.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default();
        let position = PostingPosition {
            pos,
            payload: bytes,
        };
        match list.docs.last_mut() {
            Some(last) if last.doc_id == doc_id => last.positions.push(position),
            _ => list.docs.push(DocPosting {
                doc_id,
                positions: vec![position],
            }),
        }
        list.cost += 1;
    }

    pub fn commit(self) -> MemoryIndex {
        log::info!("committed index with {} docs", self.index.num_docs());
        self.index
    }
}

/// Whitespace tokenization with character offsets.
///
/// Terms are lowercased; offsets are character (not byte) positions and the
/// end offset points at the token's last character.
fn tokenize_with_offsets(text: &str) -> Vec<(String, u32, u32)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut token_start = 0u32;
    let mut pos = 0u32;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                out.push((current.to_lowercase(), token_start, pos - 1));
                current = String::new();
            }
        } else {
            if current.is_empty() {
                token_start = pos;
            }
            current.push(ch);
        }
        pos += 1;
    }
    if !current.is_empty() {
        out.push((current.to_lowercase(), token_start, pos - 1));
    }
    out
}

enum CursorState {
    Unstarted,
    At(usize),
    Exhausted,
}

/// Cursor over one in-memory posting list.
struct MemoryPostingsCursor<'a> {
    list: &'a PostingList,
    state: CursorState,
    next_pos: usize,
    curr_pos: Option<usize>,
}

impl<'a> MemoryPostingsCursor<'a> {
    fn new(list: &'a PostingList) -> Self {
        Self {
            list,
            state: CursorState::Unstarted,
            next_pos: 0,
            curr_pos: None,
        }
    }

    fn move_to(&mut self, idx: usize) -> DocId {
        self.next_pos = 0;
        self.curr_pos = None;
        if idx < self.list.docs.len() {
            self.state = CursorState::At(idx);
            self.list.docs[idx].doc_id
        } else {
            self.state = CursorState::Exhausted;
            NO_MORE_DOCS
        }
    }

    fn current(&self) -> Option<&DocPosting> {
        match self.state {
            CursorState::At(i) => Some(&self.list.docs[i]),
            _ => None,
        }
    }
}

/// Galloping probe for the first posting with `doc_id >= target`.
fn gallop_to(docs: &[DocPosting], target: DocId, start: usize) -> usize {
    if start >= docs.len() {
        return docs.len();
    }
    if docs[start].doc_id >= target {
        return start;
    }
    let mut step = 1;
    let mut current = start;
    while current + step < docs.len() && docs[current + step].doc_id < target {
        current += step;
        step *= 2;
    }
    let upper = usize::min(current + step + 1, docs.len());
    current + 1 + docs[current + 1..upper].partition_point(|d| d.doc_id < target)
}

impl PostingsCursor for MemoryPostingsCursor<'_> {
    fn doc(&self) -> DocId {
        match self.state {
            CursorState::Unstarted | CursorState::Exhausted => NO_MORE_DOCS,
            CursorState::At(i) => self.list.docs[i].doc_id,
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        let from = match self.state {
            CursorState::Unstarted => 0,
            CursorState::At(i) => {
                if self.list.docs[i].doc_id >= target {
                    return Ok(self.list.docs[i].doc_id);
                }
                i
            }
            CursorState::Exhausted => return Ok(NO_MORE_DOCS),
        };
        let idx = gallop_to(&self.list.docs, target, from);
        Ok(self.move_to(idx))
    }

    fn next_doc(&mut self) -> Result<DocId> {
        let idx = match self.state {
            CursorState::Unstarted => 0,
            CursorState::At(i) => i + 1,
            CursorState::Exhausted => return Ok(NO_MORE_DOCS),
        };
        Ok(self.move_to(idx))
    }

    fn freq(&self) -> u32 {
        self.current().map_or(0, |d| d.positions.len() as u32)
    }

    fn next_position(&mut self) -> Result<u32> {
        let doc = self.current().ok_or_else(|| {
            EngineError::Invariant("next_position called with no current document".to_string())
        })?;
        if self.next_pos >= doc.positions.len() {
            return Err(EngineError::Invariant(format!(
                "next_position called more than freq()={} times",
                doc.positions.len()
            )));
        }
        let pos = doc.positions[self.next_pos].pos;
        self.curr_pos = Some(self.next_pos);
        self.next_pos += 1;
        Ok(pos)
    }

    fn payload(&self) -> Result<&[u8]> {
        let doc = self.current().ok_or_else(|| {
            EngineError::Invariant("payload called with no current document".to_string())
        })?;
        let idx = self.curr_pos.ok_or_else(|| {
            EngineError::Invariant("payload called before next_position".to_string())
        })?;
        Ok(&doc.positions[idx].payload)
    }

    fn cost(&self) -> u64 {
        self.list.cost
    }
}
