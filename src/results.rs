//! Query result types returned to hosts and printed by the CLI.

use serde::{Deserialize, Serialize};

use crate::compiler::ast::{CompiledQuery, ElementKind};
use crate::engine::collector::MatchTuple;
use crate::engine::stats::ExecStats;
use crate::types::ElementSpan;

/// One query element's occurrence inside a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Element label from the query; empty if the element was unlabeled.
    pub label: String,
    /// Surface string the element queried.
    pub token: String,
    pub kind: ElementKind,
    pub span: ElementSpan,
}

/// One matched tuple: a document plus one binding per query element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// External document number.
    pub docno: String,
    pub bindings: Vec<Binding>,
}

/// All matches of one query execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub total_matches: usize,
    pub matches: Vec<MatchResult>,
    pub stats: ExecStats,
}

impl QueryResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a response from raw tuples, resolving external document
    /// numbers through `docno` and element metadata through the query.
    pub fn from_tuples<'a>(
        query: &CompiledQuery,
        tuples: Vec<MatchTuple>,
        stats: ExecStats,
        docno: impl Fn(crate::index::postings::DocId) -> Option<&'a str>,
    ) -> Self {
        let matches: Vec<MatchResult> = tuples
            .into_iter()
            .map(|t| MatchResult {
                docno: docno(t.doc_id).unwrap_or_default().to_string(),
                bindings: t
                    .spans
                    .iter()
                    .zip(&query.elements)
                    .map(|(span, el)| Binding {
                        label: el.label.clone(),
                        token: el.token.clone(),
                        kind: el.kind,
                        span: *span,
                    })
                    .collect(),
            })
            .collect();
        Self {
            total_matches: matches.len(),
            matches,
            stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Short human-readable listing for terminal output.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Total matches: {}\n", self.total_matches));
        for (i, m) in self.matches.iter().enumerate() {
            out.push_str(&format!("  {}. doc {}\n", i + 1, m.docno));
            for b in &m.bindings {
                let label = if b.label.is_empty() { "_" } else { b.label.as_str() };
                out.push_str(&format!(
                    "     {label}={} [{}..{}] id={} parent={}\n",
                    b.token, b.span.start_offset, b.span.end_offset, b.span.id, b.span.parent_id
                ));
            }
        }
        out
    }
}
