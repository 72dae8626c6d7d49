//! Error taxonomy for query compilation and execution.

use thiserror::Error;

/// Errors surfaced by the query compiler, the index boundary, and the
/// match engine. Empty result sets are values, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed query text; surfaced to the caller before execution.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Index schema does not satisfy the attributes the engine relies on.
    #[error("schema error: {0}")]
    Schema(String),

    /// A per-position payload failed to decode; fatal for the running query.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Broken internal invariant (unsorted offsets, cursor misuse).
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// Failure in the underlying index storage, propagated unchanged.
    #[error("index I/O failure")]
    Io(#[from] std::io::Error),

    /// Index snapshot could not be serialized or deserialized.
    #[error("index snapshot failure")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
