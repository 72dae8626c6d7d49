pub mod ast;
pub mod parser;

pub use ast::{CompiledQuery, ConstraintEdge, ConstraintKind, ElementKind, QueryElement};
pub use parser::QueryParser;
