//! Posting-enumerator boundary consumed by the match engine.

use crate::error::Result;

/// Document id inside one index.
pub type DocId = u32;

/// Sentinel returned once a cursor runs out of documents.
pub const NO_MORE_DOCS: DocId = DocId::MAX;

/// One term's posting stream: documents in ascending id order, and for the
/// current document a sequence of positions carrying payload bytes.
///
/// Positions within a document must arrive in ascending start-offset order;
/// the payload at each position decodes per [`crate::payload`]. `doc()` is
/// meaningful only after the first `advance`/`next_doc` call.
pub trait PostingsCursor: Send {
    /// Current document id, or [`NO_MORE_DOCS`] when exhausted.
    fn doc(&self) -> DocId;

    /// Move to the first document with id >= `target`.
    fn advance(&mut self, target: DocId) -> Result<DocId>;

    /// Move to the next document.
    fn next_doc(&mut self) -> Result<DocId>;

    /// Number of positions in the current document.
    fn freq(&self) -> u32;

    /// Step to the next position of the current document; callable at most
    /// `freq()` times per document.
    fn next_position(&mut self) -> Result<u32>;

    /// Payload bytes of the position last returned by `next_position`.
    fn payload(&self) -> Result<&[u8]>;

    /// Total occurrences of the term across the index; drives the
    /// execution-order heuristic.
    fn cost(&self) -> u64;
}

/// Cursor for a term absent from the index: immediately exhausted.
///
/// Standing in an empty cursor lets the engine run the normal intersection
/// loop, which terminates on the first alignment attempt.
pub struct EmptyCursor;

impl PostingsCursor for EmptyCursor {
    fn doc(&self) -> DocId {
        NO_MORE_DOCS
    }

    fn advance(&mut self, _target: DocId) -> Result<DocId> {
        Ok(NO_MORE_DOCS)
    }

    fn next_doc(&mut self) -> Result<DocId> {
        Ok(NO_MORE_DOCS)
    }

    fn freq(&self) -> u32 {
        0
    }

    fn next_position(&mut self) -> Result<u32> {
        Err(crate::error::EngineError::Invariant(
            "next_position called on an exhausted cursor".to_string(),
        ))
    }

    fn payload(&self) -> Result<&[u8]> {
        Err(crate::error::EngineError::Invariant(
            "payload called on an exhausted cursor".to_string(),
        ))
    }

    fn cost(&self) -> u64 {
        0
    }
}
