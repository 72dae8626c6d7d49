//! Query execution: document intersection and constraint satisfaction.
//!
//! The executor owns one [`PostingState`] per query element. States are
//! processed in ascending `(min_comp_post_cost, -connect_qty)` order, so the
//! cheapest connected component is exhausted first and, within a component,
//! the most constrained element binds earliest. Document ids are aligned by
//! a galloping AND over all cursors; for each aligned document a
//! backtracking recursion fixes one occurrence per element, checking each
//! constraint exactly once at the moment its later-bound endpoint is chosen.

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::compiler::ast::{CompiledQuery, ConstraintKind};
use crate::engine::collector::{Flow, MatchSink};
use crate::engine::state::{ConstraintRef, PostingState, DEFAULT_LIN_SEARCH_ITERS};
use crate::engine::stats::ExecStats;
use crate::error::{EngineError, Result};
use crate::index::postings::{DocId, NO_MORE_DOCS};
use crate::types::ElementSpan;

pub struct QueryExecutor<'a> {
    /// States in processing order; position == sort index.
    states: Vec<PostingState<'a>>,
    /// Sorted-state position of each query element, by element index.
    state_of_element: Vec<usize>,
    lin_search_iters: usize,
    /// Reused for every emitted tuple; spans appear in element order.
    tuple: Vec<ElementSpan>,
    stats: ExecStats,
}

impl<'a> QueryExecutor<'a> {
    /// Order the states, fix sort indices, and build each state's constraint
    /// index. `states[k]` must wrap element `k` of `query`.
    pub fn new(query: &CompiledQuery, mut states: Vec<PostingState<'a>>) -> Result<Self> {
        if states.len() != query.len() {
            return Err(EngineError::Invariant(format!(
                "query has {} elements but {} posting states were supplied",
                query.len(),
                states.len()
            )));
        }

        // Cheapest posting of each connected component bounds how fast the
        // whole component can be driven through the intersection.
        let mut component_min: HashMap<usize, u64> = HashMap::new();
        for state in &states {
            let entry = component_min
                .entry(state.component_id())
                .or_insert(u64::MAX);
            *entry = (*entry).min(state.post_cost());
        }
        for state in &mut states {
            let min = component_min[&state.component_id()];
            state.set_min_comp_post_cost(min);
        }

        states.sort_by_key(|s| (s.min_comp_post_cost(), Reverse(s.connect_qty())));

        let mut state_of_element = vec![0usize; states.len()];
        for (pos, state) in states.iter_mut().enumerate() {
            state.set_sort_index(pos);
            state_of_element[state.element_index()] = pos;
        }

        // Attach every constraint edge to its later-bound endpoint; the
        // other endpoint is already fixed when the check runs.
        let mut indices: Vec<Vec<ConstraintRef>> = vec![Vec::new(); states.len()];
        for edge in &query.constraints {
            let constraining = state_of_element[edge.head];
            let dependent = state_of_element[edge.dependent];
            let owner = constraining.max(dependent);
            indices[owner].push(ConstraintRef {
                constraining,
                dependent,
                kind: edge.kind,
            });
        }
        for (state, index) in states.iter_mut().zip(indices) {
            state.set_constraint_index(index);
        }

        let tuple = vec![ElementSpan::default(); states.len()];
        Ok(Self {
            states,
            state_of_element,
            lin_search_iters: DEFAULT_LIN_SEARCH_ITERS,
            tuple,
            stats: ExecStats::default(),
        })
    }

    /// States in processing order.
    pub fn states(&self) -> &[PostingState<'a>] {
        &self.states
    }

    /// Run over all documents, feeding matches to `sink`.
    pub fn execute(&mut self, sink: &mut dyn MatchSink) -> Result<ExecStats> {
        self.run(None, sink)
    }

    /// Run starting from the first document with id >= `floor`.
    pub fn execute_from(&mut self, floor: DocId, sink: &mut dyn MatchSink) -> Result<ExecStats> {
        self.run(Some(floor), sink)
    }

    fn run(&mut self, floor: Option<DocId>, sink: &mut dyn MatchSink) -> Result<ExecStats> {
        if self.states.is_empty() {
            return Ok(self.stats);
        }

        // Position every cursor once; afterwards alignment only advances
        // lagging states.
        for state in &mut self.states {
            let doc = match floor {
                Some(f) => state.advance(f)?,
                None => state.next_doc()?,
            };
            if doc == NO_MORE_DOCS {
                return Ok(self.stats);
            }
        }

        loop {
            let doc = self.align()?;
            if doc == NO_MORE_DOCS {
                break;
            }
            self.stats.docs_seen += 1;

            for state in &mut self.states {
                state.read_doc_elements()?;
            }

            let emitted_before = self.stats.tuples_emitted;
            let flow = self.match_from(0, sink)?;
            if self.stats.tuples_emitted > emitted_before {
                self.stats.docs_matched += 1;
            }
            if flow == Flow::Halt {
                break;
            }

            if self.states[0].next_doc()? == NO_MORE_DOCS {
                break;
            }
        }
        Ok(self.stats)
    }

    /// Gallop all states to a common document id.
    ///
    /// Repeatedly advances every state lagging the current maximum; one
    /// exhausted cursor ends the whole intersection.
    fn align(&mut self) -> Result<DocId> {
        let mut target = 0;
        for state in &self.states {
            let doc = state.doc();
            if doc == NO_MORE_DOCS {
                return Ok(NO_MORE_DOCS);
            }
            target = target.max(doc);
        }

        loop {
            let mut max_doc = target;
            let mut aligned = true;
            for state in &mut self.states {
                if state.doc() < target && state.advance(target)? == NO_MORE_DOCS {
                    return Ok(NO_MORE_DOCS);
                }
                let doc = state.doc();
                if doc != target {
                    aligned = false;
                    max_doc = max_doc.max(doc);
                }
            }
            if aligned {
                return Ok(target);
            }
            target = max_doc;
        }
    }

    /// Bind one occurrence of state `i` and recurse; depth `states.len()`
    /// emits the tuple.
    fn match_from(&mut self, i: usize, sink: &mut dyn MatchSink) -> Result<Flow> {
        if i == self.states.len() {
            return Ok(self.emit(sink));
        }

        // Containment window from the already-bound heads of this state's
        // CONTAINS constraints. Occurrences are sorted by start offset, so
        // everything before the window is skipped in one probe and the scan
        // stops at the first start offset past the tightest head end.
        let mut window: Option<(u32, u32)> = None;
        for r in self.states[i].constraint_refs() {
            if r.kind == ConstraintKind::Contains && r.dependent == i && r.constraining != i {
                let head = self.states[r.constraining].curr_element();
                let (lo, hi) = window.unwrap_or((0, u32::MAX));
                window = Some((lo.max(head.start_offset), hi.min(head.end_offset)));
            }
        }

        let mut j = match window {
            Some((lo, _)) if lo > 0 => {
                self.states[i].find_elem_larger_offset(self.lin_search_iters, lo - 1, 0)
            }
            _ => 0,
        };

        while j < self.states[i].qty() {
            if let Some((_, hi)) = window {
                if self.states[i].element_at(j).start_offset > hi {
                    break;
                }
            }
            self.states[i].set_curr_elem_index(j);
            if check_incremental(&self.states, i, &mut self.stats) {
                match self.match_from(i + 1, sink)? {
                    Flow::Continue => {}
                    Flow::SkipDoc => return Ok(Flow::SkipDoc),
                    Flow::Halt => return Ok(Flow::Halt),
                }
            }
            j += 1;
        }
        Ok(Flow::Continue)
    }

    fn emit(&mut self, sink: &mut dyn MatchSink) -> Flow {
        self.stats.tuples_emitted += 1;
        for (element_index, &pos) in self.state_of_element.iter().enumerate() {
            self.tuple[element_index] = *self.states[pos].curr_element();
        }
        sink.on_match(self.states[0].doc(), &self.tuple)
    }
}

/// Check every constraint whose later-bound endpoint is state `i`.
///
/// All referenced states have smaller sort indices and their occurrences are
/// fixed, so each check is a constant-time comparison.
fn check_incremental(states: &[PostingState<'_>], i: usize, stats: &mut ExecStats) -> bool {
    for r in states[i].constraint_refs() {
        stats.constraint_checks += 1;
        let head = states[r.constraining].curr_element();
        let dep = states[r.dependent].curr_element();
        let ok = match r.kind {
            ConstraintKind::Parent => dep.parent_id == head.id,
            ConstraintKind::Contains => head.contains(dep),
        };
        if !ok {
            return false;
        }
    }
    true
}
