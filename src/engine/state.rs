//! Per-element posting state.
//!
//! One [`PostingState`] wraps one posting cursor for the lifetime of a query
//! execution. It drives document iteration, decodes the current document's
//! positions into a start-offset-sorted span buffer, and holds the ordering
//! statistics and the precomputed constraint index the recursion reads.
//!
//! A state is never shared between threads: it owns a mutable element cursor
//! and reuses its span buffer across documents.

use crate::compiler::ast::{ConstraintKind, QueryElement};
use crate::error::{EngineError, Result};
use crate::index::postings::{DocId, PostingsCursor, NO_MORE_DOCS};
use crate::payload;
use crate::types::ElementSpan;

/// Initial span-buffer capacity; the buffer doubles on demand and is kept
/// across documents of one execution.
const INIT_ELEM_CAPACITY: usize = 512;

/// Linear steps taken before `find_elem_larger_offset` switches to the
/// exponential probe.
pub const DEFAULT_LIN_SEARCH_ITERS: usize = 4;

/// One constraint attached to the posting state with the larger sort index.
///
/// Both endpoints are positions in the executor's sorted state array, so the
/// check never chases object references (the query graph is cyclic; indices
/// keep ownership flat).
#[derive(Debug, Clone, Copy)]
pub struct ConstraintRef {
    /// Sorted position of the constraining state.
    pub constraining: usize,
    /// Sorted position of the dependent state.
    pub dependent: usize,
    pub kind: ConstraintKind,
}

pub struct PostingState<'a> {
    cursor: Box<dyn PostingsCursor + 'a>,
    /// Index of the element in the compiled query (pre-sort identity).
    element_index: usize,
    doc_id: Option<DocId>,
    buffer: Vec<ElementSpan>,
    curr_elem: usize,
    post_cost: u64,
    connect_qty: usize,
    component_id: usize,
    min_comp_post_cost: u64,
    sort_index: usize,
    constraint_index: Vec<ConstraintRef>,
}

impl<'a> PostingState<'a> {
    pub fn new(
        cursor: Box<dyn PostingsCursor + 'a>,
        element: &QueryElement,
        element_index: usize,
    ) -> Self {
        let post_cost = cursor.cost();
        Self {
            cursor,
            element_index,
            doc_id: None,
            buffer: Vec::with_capacity(INIT_ELEM_CAPACITY),
            curr_elem: 0,
            post_cost,
            connect_qty: element.connect_qty,
            component_id: element.component_id,
            min_comp_post_cost: u64::MAX,
            sort_index: 0,
            constraint_index: Vec::new(),
        }
    }

    // ---- document iteration -------------------------------------------------

    /// Current document id; [`NO_MORE_DOCS`] when exhausted or not yet
    /// positioned.
    pub fn doc(&self) -> DocId {
        self.doc_id.unwrap_or(NO_MORE_DOCS)
    }

    pub fn is_started(&self) -> bool {
        self.doc_id.is_some()
    }

    /// Move to the first document with id >= `target`; invalidates the span
    /// buffer.
    pub fn advance(&mut self, target: DocId) -> Result<DocId> {
        self.buffer.clear();
        let doc = match self.doc_id {
            Some(NO_MORE_DOCS) => NO_MORE_DOCS,
            _ => self.cursor.advance(target)?,
        };
        self.doc_id = Some(doc);
        Ok(doc)
    }

    /// Move to the next document; invalidates the span buffer.
    pub fn next_doc(&mut self) -> Result<DocId> {
        self.buffer.clear();
        let doc = match self.doc_id {
            Some(NO_MORE_DOCS) => NO_MORE_DOCS,
            _ => self.cursor.next_doc()?,
        };
        self.doc_id = Some(doc);
        Ok(doc)
    }

    /// Decode every position of the current document into the span buffer.
    ///
    /// The posting stream guarantees ascending start offsets; a violation
    /// means the index is broken and aborts the query.
    pub fn read_doc_elements(&mut self) -> Result<()> {
        self.curr_elem = 0;
        self.buffer.clear();
        let freq = self.cursor.freq() as usize;
        self.buffer.reserve(freq);
        let mut last_start = 0u32;
        for _ in 0..freq {
            self.cursor.next_position()?;
            let span = payload::decode(self.cursor.payload()?)?;
            if span.start_offset < last_start {
                return Err(EngineError::Invariant(format!(
                    "positions out of start-offset order in doc {}: {} after {}",
                    self.doc(),
                    span.start_offset,
                    last_start
                )));
            }
            last_start = span.start_offset;
            self.buffer.push(span);
        }
        Ok(())
    }

    // ---- span buffer --------------------------------------------------------

    /// Number of occurrences loaded for the current document.
    pub fn qty(&self) -> usize {
        self.buffer.len()
    }

    pub fn element_at(&self, i: usize) -> &ElementSpan {
        &self.buffer[i]
    }

    /// Occurrence currently bound for this element.
    pub fn curr_element(&self) -> &ElementSpan {
        &self.buffer[self.curr_elem]
    }

    pub fn set_curr_elem_index(&mut self, i: usize) {
        self.curr_elem = i;
    }

    pub fn curr_elem_index(&self) -> usize {
        self.curr_elem
    }

    /// Smallest index `i >= min_index` with `start_offset > offset_to_exceed`,
    /// or `qty()` if there is none.
    pub fn find_elem_larger_offset(
        &self,
        lin_search_iters: usize,
        offset_to_exceed: u32,
        min_index: usize,
    ) -> usize {
        find_larger_offset(&self.buffer, lin_search_iters, offset_to_exceed, min_index)
    }

    // ---- ordering statistics ------------------------------------------------

    /// Term occurrences across the index, from the cursor.
    pub fn post_cost(&self) -> u64 {
        self.post_cost
    }

    /// Number of elements in this element's connected component (0 if the
    /// element has no constraint edges).
    pub fn connect_qty(&self) -> usize {
        self.connect_qty
    }

    pub fn component_id(&self) -> usize {
        self.component_id
    }

    /// Minimum posting cost within this element's connected component.
    pub fn min_comp_post_cost(&self) -> u64 {
        self.min_comp_post_cost
    }

    pub(crate) fn set_min_comp_post_cost(&mut self, cost: u64) {
        self.min_comp_post_cost = cost;
    }

    /// Position in the executor's processing order.
    pub fn sort_index(&self) -> usize {
        self.sort_index
    }

    pub(crate) fn set_sort_index(&mut self, sort_index: usize) {
        self.sort_index = sort_index;
    }

    pub fn element_index(&self) -> usize {
        self.element_index
    }

    // ---- constraint index ---------------------------------------------------

    pub(crate) fn set_constraint_index(&mut self, index: Vec<ConstraintRef>) {
        self.constraint_index = index;
    }

    /// Constraints to check when this state's element is tentatively bound;
    /// every other endpoint has a smaller sort index and is already fixed.
    pub fn constraint_refs(&self) -> &[ConstraintRef] {
        &self.constraint_index
    }
}

/// Exponential search over a start-offset-sorted span slice.
///
/// Takes up to `lin_search_iters` linear steps first; short hops dominate in
/// practice and skip the probe entirely. The stride then doubles until it
/// overshoots (clamped to the slice end), and a binary search over the
/// bracketed window lands on the first strictly larger offset.
pub(crate) fn find_larger_offset(
    spans: &[ElementSpan],
    lin_search_iters: usize,
    offset_to_exceed: u32,
    min_index: usize,
) -> usize {
    let qty = spans.len();
    let mut indx = min_index;

    for _ in 0..lin_search_iters {
        if indx >= qty {
            return qty;
        }
        if spans[indx].start_offset > offset_to_exceed {
            return indx;
        }
        indx += 1;
    }
    if indx >= qty {
        return qty;
    }
    if spans[indx].start_offset > offset_to_exceed {
        return indx;
    }

    // Invariant: spans[indx1].start_offset <= offset_to_exceed.
    let mut d = 1usize;
    let mut indx1 = indx;
    let indx2;
    loop {
        let probe = indx1 + d;
        if probe < qty {
            if spans[probe].start_offset > offset_to_exceed {
                indx2 = probe;
                break;
            }
            indx1 = probe;
        } else {
            if spans[qty - 1].start_offset <= offset_to_exceed {
                return qty;
            }
            indx2 = qty;
            break;
        }
        let max_diff = qty - indx1;
        if d <= max_diff >> 1 {
            d <<= 1;
        } else {
            d = max_diff;
        }
    }

    // spans[indx1] <= offset_to_exceed < spans[indx2]; binary refinement
    // lands on the first strictly greater entry, past any ties.
    indx1
        + spans[indx1..indx2].partition_point(|s| s.start_offset <= offset_to_exceed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::ElementKind;
    use crate::error::EngineError;

    /// Cursor over a single scripted document; payloads are raw bytes so
    /// corrupt input is expressible.
    struct ScriptedCursor {
        doc_id: DocId,
        payloads: Vec<Vec<u8>>,
        started: bool,
        pos: Option<usize>,
    }

    impl ScriptedCursor {
        fn new(doc_id: DocId, payloads: Vec<Vec<u8>>) -> Self {
            Self {
                doc_id,
                payloads,
                started: false,
                pos: None,
            }
        }
    }

    impl crate::index::postings::PostingsCursor for ScriptedCursor {
        fn doc(&self) -> DocId {
            if self.started {
                self.doc_id
            } else {
                NO_MORE_DOCS
            }
        }

        fn advance(&mut self, target: DocId) -> crate::error::Result<DocId> {
            if self.started || target > self.doc_id {
                self.doc_id = NO_MORE_DOCS;
            }
            self.started = true;
            self.pos = None;
            Ok(self.doc_id)
        }

        fn next_doc(&mut self) -> crate::error::Result<DocId> {
            if self.started {
                self.doc_id = NO_MORE_DOCS;
            }
            self.started = true;
            self.pos = None;
            Ok(self.doc_id)
        }

        fn freq(&self) -> u32 {
            self.payloads.len() as u32
        }

        fn next_position(&mut self) -> crate::error::Result<u32> {
            let next = self.pos.map_or(0, |p| p + 1);
            self.pos = Some(next);
            Ok(next as u32)
        }

        fn payload(&self) -> crate::error::Result<&[u8]> {
            Ok(&self.payloads[self.pos.unwrap()])
        }

        fn cost(&self) -> u64 {
            self.payloads.len() as u64
        }
    }

    fn element() -> crate::compiler::ast::QueryElement {
        crate::compiler::ast::QueryElement {
            token: "cat".to_string(),
            kind: ElementKind::Token,
            label: String::new(),
            connect_qty: 0,
            component_id: 0,
        }
    }

    #[test]
    fn test_read_doc_elements_decodes_in_stream_order() {
        let cursor = ScriptedCursor::new(
            7,
            vec![b"0,2,0,0".to_vec(), b"4,6,0,0".to_vec(), b"4,9,0,0".to_vec()],
        );
        let mut state = PostingState::new(Box::new(cursor), &element(), 0);
        assert_eq!(state.next_doc().unwrap(), 7);
        state.read_doc_elements().unwrap();
        assert_eq!(state.qty(), 3);
        assert_eq!(*state.element_at(0), ElementSpan::token(0, 2));
        assert_eq!(*state.element_at(1), ElementSpan::token(4, 6));
        assert_eq!(*state.element_at(2), ElementSpan::token(4, 9));
    }

    #[test]
    fn test_read_doc_elements_rejects_unsorted_positions() {
        let cursor = ScriptedCursor::new(3, vec![b"5,6,0,0".to_vec(), b"1,2,0,0".to_vec()]);
        let mut state = PostingState::new(Box::new(cursor), &element(), 0);
        state.next_doc().unwrap();
        assert!(matches!(
            state.read_doc_elements(),
            Err(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn test_read_doc_elements_propagates_corrupt_payload() {
        let cursor = ScriptedCursor::new(3, vec![b"not-a-payload".to_vec()]);
        let mut state = PostingState::new(Box::new(cursor), &element(), 0);
        state.next_doc().unwrap();
        assert!(matches!(
            state.read_doc_elements(),
            Err(EngineError::CorruptPayload(_))
        ));
    }

    #[test]
    fn test_state_stays_exhausted() {
        let cursor = ScriptedCursor::new(3, vec![b"0,1,0,0".to_vec()]);
        let mut state = PostingState::new(Box::new(cursor), &element(), 0);
        assert_eq!(state.next_doc().unwrap(), 3);
        assert_eq!(state.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(state.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(state.advance(1).unwrap(), NO_MORE_DOCS);
    }

    fn spans(offsets: &[u32]) -> Vec<ElementSpan> {
        offsets
            .iter()
            .map(|&o| ElementSpan::token(o, o + 1))
            .collect()
    }

    // Buffer from the search-boundary scenario: [1,1,3,3,5,5,5,9].
    fn boundary_buffer() -> Vec<ElementSpan> {
        spans(&[1, 1, 3, 3, 5, 5, 5, 9])
    }

    #[test]
    fn test_search_boundary_ties_resolved_past_run() {
        let buf = boundary_buffer();
        assert_eq!(find_larger_offset(&buf, 2, 5, 0), 7);
    }

    #[test]
    fn test_search_boundary_last_element_not_larger() {
        let buf = boundary_buffer();
        assert_eq!(find_larger_offset(&buf, 2, 9, 0), 8);
    }

    #[test]
    fn test_search_resolved_within_linear_phase() {
        let buf = boundary_buffer();
        assert_eq!(find_larger_offset(&buf, 10, 0, 0), 0);
        assert_eq!(find_larger_offset(&buf, 10, 5, 0), 7);
    }

    #[test]
    fn test_search_falls_through_to_doubling() {
        // Long run below the threshold forces the exponential phase.
        let buf = spans(&[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 3]);
        assert_eq!(find_larger_offset(&buf, 2, 1, 0), 12);
        assert_eq!(find_larger_offset(&buf, 0, 1, 0), 12);
    }

    #[test]
    fn test_search_doubling_clamped_at_end() {
        // Stride overshoots the tail; the clamp still finds the answer.
        let buf = spans(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 100]);
        assert_eq!(find_larger_offset(&buf, 1, 8, 0), 9);
        assert_eq!(find_larger_offset(&buf, 1, 100, 0), 10);
    }

    #[test]
    fn test_search_respects_min_index() {
        let buf = boundary_buffer();
        assert_eq!(find_larger_offset(&buf, 2, 0, 3), 3);
        assert_eq!(find_larger_offset(&buf, 2, 5, 7), 7);
        assert_eq!(find_larger_offset(&buf, 2, 9, 7), 8);
    }

    #[test]
    fn test_search_empty_and_out_of_range() {
        assert_eq!(find_larger_offset(&[], 4, 0, 0), 0);
        let buf = boundary_buffer();
        assert_eq!(find_larger_offset(&buf, 4, 5, 100), 8);
    }

    #[test]
    fn test_search_postcondition_holds_exhaustively() {
        // Invariant: result r is the first index >= min with offset >
        // threshold; everything in [min, r) is <= threshold.
        let buf = spans(&[0, 0, 2, 2, 2, 4, 7, 7, 9, 12]);
        for lin in [0usize, 1, 2, 4, 16] {
            for min_index in 0..=buf.len() {
                for threshold in 0..14u32 {
                    let r = find_larger_offset(&buf, lin, threshold, min_index);
                    assert!(r == buf.len() || buf[r].start_offset > threshold);
                    for s in &buf[min_index.min(buf.len())..r] {
                        assert!(s.start_offset <= threshold);
                    }
                    if r > min_index {
                        // r is minimal: the previous entry does not qualify.
                        assert!(buf[r - 1].start_offset <= threshold);
                    }
                }
            }
        }
    }
}
