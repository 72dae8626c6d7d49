//! Structured search over annotated text.
//!
//! Queries describe tokens and annotations with optional labels plus
//! `contains`/`parent` constraints between them; the engine intersects the
//! per-element posting streams and enumerates, per document, the occurrence
//! assignments satisfying every constraint.

pub mod compiler;
pub mod data;
pub mod engine;
pub mod error;
pub mod index;
pub mod payload;
pub mod results;
pub mod types;

pub use compiler::{CompiledQuery, ConstraintKind, ElementKind, QueryParser};
pub use engine::{
    DocSetCollector, ExecStats, Flow, MatchSink, QueryExecutor, SearchEngine, TupleCollector,
};
pub use error::{EngineError, Result};
pub use index::{
    Annotation, DocId, MemoryIndex, MemoryIndexWriter, PostingsCursor, SchemaConfig, NO_MORE_DOCS,
};
pub use results::{Binding, MatchResult, QueryResponse};
pub use types::ElementSpan;
