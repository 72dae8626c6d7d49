//! Top-level search engine tying the compiler, the index, and the executor.

use std::path::Path;

use rayon::prelude::*;

use crate::compiler::ast::{CompiledQuery, ElementKind};
use crate::compiler::parser::QueryParser;
use crate::engine::collector::{DocSetCollector, TupleCollector};
use crate::engine::executor::QueryExecutor;
use crate::engine::state::PostingState;
use crate::error::Result;
use crate::index::memory::MemoryIndex;
use crate::index::postings::DocId;
use crate::results::QueryResponse;

/// Structured-search engine over one index.
///
/// The engine itself is shareable: compiled queries are immutable and every
/// execution builds its own posting states, so concurrent queries never
/// touch shared mutable state.
pub struct SearchEngine {
    index: MemoryIndex,
}

impl SearchEngine {
    /// Wrap an index, re-checking the schema attributes the engine needs.
    pub fn new(index: MemoryIndex) -> Result<Self> {
        index.schema().validate()?;
        Ok(Self { index })
    }

    /// Load an index snapshot from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(MemoryIndex::load(path)?)
    }

    pub fn index(&self) -> &MemoryIndex {
        &self.index
    }

    pub fn num_docs(&self) -> usize {
        self.index.num_docs()
    }

    /// Parse a query string.
    pub fn compile(&self, query: &str) -> Result<CompiledQuery> {
        let compiled = QueryParser::new().parse(query)?;
        log::debug!(
            "compiled query '{}': {} elements, {} constraints",
            query,
            compiled.len(),
            compiled.constraints.len()
        );
        Ok(compiled)
    }

    /// Parse and run a query, returning up to `limit` match tuples.
    pub fn search(&self, query: &str, limit: usize) -> Result<QueryResponse> {
        let compiled = self.compile(query)?;
        let response = self.execute(&compiled, None, limit)?;
        response.stats.log_summary(query);
        Ok(response)
    }

    /// Like [`search`](Self::search), but only documents at or past `floor`
    /// are considered. Used for paging through large result sets.
    pub fn search_after(&self, query: &str, floor: DocId, limit: usize) -> Result<QueryResponse> {
        let compiled = self.compile(query)?;
        self.execute(&compiled, Some(floor), limit)
    }

    /// Parse and run a query, returning matching doc ids only (one entry per
    /// document, ascending).
    pub fn search_docs(&self, query: &str, limit: usize) -> Result<Vec<DocId>> {
        let compiled = self.compile(query)?;
        let mut executor = QueryExecutor::new(&compiled, self.open_states(&compiled))?;
        let mut collector = DocSetCollector::new(limit);
        executor.execute(&mut collector)?;
        Ok(collector.docs)
    }

    /// Run many independent queries in parallel; each execution stays
    /// single-threaded over its own posting states.
    pub fn search_batch(&self, queries: &[String], limit: usize) -> Vec<Result<QueryResponse>> {
        queries
            .par_iter()
            .map(|q| self.search(q, limit))
            .collect()
    }

    /// Run a pre-compiled query.
    pub fn execute(
        &self,
        query: &CompiledQuery,
        floor: Option<DocId>,
        limit: usize,
    ) -> Result<QueryResponse> {
        let mut executor = QueryExecutor::new(query, self.open_states(query))?;
        let mut collector = TupleCollector::new(limit);
        let stats = match floor {
            Some(f) => executor.execute_from(f, &mut collector)?,
            None => executor.execute(&mut collector)?,
        };
        Ok(QueryResponse::from_tuples(
            query,
            collector.matches,
            stats,
            |doc| self.index.docno(doc),
        ))
    }

    /// One posting state per query element, in element order.
    fn open_states(&self, query: &CompiledQuery) -> Vec<PostingState<'_>> {
        let schema = self.index.schema();
        query
            .elements
            .iter()
            .enumerate()
            .map(|(k, el)| {
                let (field, term) = match el.kind {
                    // The text tokenizer lowercases; match it at query time.
                    ElementKind::Token => (schema.text_field.as_str(), el.token.to_lowercase()),
                    ElementKind::Annotation => (schema.annot_field.as_str(), el.token.clone()),
                };
                let cursor = self.index.open_cursor(field, &term);
                let state = PostingState::new(cursor, el, k);
                log::debug!(
                    "opened posting for '{}' in field '{}': cost={}",
                    term,
                    field,
                    state.post_cost()
                );
                state
            })
            .collect()
    }
}
