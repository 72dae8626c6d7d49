//! Per-execution counters.

use serde::{Deserialize, Serialize};

/// Counters accumulated by one query execution. Instance-local: each
/// execution is confined to one worker, so no shared state is involved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecStats {
    /// Documents all posting streams agreed on.
    pub docs_seen: u64,
    /// Aligned documents that produced at least one tuple.
    pub docs_matched: u64,
    pub tuples_emitted: u64,
    /// Individual constraint evaluations across the recursion.
    pub constraint_checks: u64,
}

impl ExecStats {
    pub fn log_summary(&self, query: &str) {
        log::debug!(
            "query '{}': {} docs aligned, {} matched, {} tuples, {} constraint checks",
            query,
            self.docs_seen,
            self.docs_matched,
            self.tuples_emitted,
            self.constraint_checks
        );
    }
}
