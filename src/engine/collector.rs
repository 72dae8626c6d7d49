//! Match sinks: where the engine reports its tuples.

use crate::index::postings::DocId;
use crate::types::ElementSpan;

/// What the executor should do after a reported match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep enumerating tuples.
    Continue,
    /// Done with this document; move to the next one.
    SkipDoc,
    /// Stop the whole execution.
    Halt,
}

/// Host-provided sink invoked once per matching tuple.
///
/// `tuple` holds exactly one occurrence per query element, in element order.
/// Deduplicating at document granularity is the sink's business.
pub trait MatchSink {
    fn on_match(&mut self, doc_id: DocId, tuple: &[ElementSpan]) -> Flow;
}

/// A fully bound match tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTuple {
    pub doc_id: DocId,
    pub spans: Vec<ElementSpan>,
}

/// Collects every tuple up to a limit.
pub struct TupleCollector {
    pub matches: Vec<MatchTuple>,
    limit: usize,
}

impl TupleCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            matches: Vec::new(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }
}

impl MatchSink for TupleCollector {
    fn on_match(&mut self, doc_id: DocId, tuple: &[ElementSpan]) -> Flow {
        self.matches.push(MatchTuple {
            doc_id,
            spans: tuple.to_vec(),
        });
        if self.matches.len() >= self.limit {
            Flow::Halt
        } else {
            Flow::Continue
        }
    }
}

/// Collects document membership only: the first tuple of a document records
/// the doc id and skips the rest of its enumeration.
pub struct DocSetCollector {
    pub docs: Vec<DocId>,
    limit: usize,
}

impl DocSetCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            docs: Vec::new(),
            limit,
        }
    }
}

impl MatchSink for DocSetCollector {
    fn on_match(&mut self, doc_id: DocId, _tuple: &[ElementSpan]) -> Flow {
        self.docs.push(doc_id);
        if self.docs.len() >= self.limit {
            Flow::Halt
        } else {
            Flow::SkipDoc
        }
    }
}

/// Counts tuples without keeping them.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub tuples: u64,
}

impl MatchSink for CountingSink {
    fn on_match(&mut self, _doc_id: DocId, _tuple: &[ElementSpan]) -> Flow {
        self.tuples += 1;
        Flow::Continue
    }
}
