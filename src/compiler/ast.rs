//! Compiled representation of a structured query.

use serde::{Deserialize, Serialize};

/// Prefix introducing a plain text token element.
pub const TOKEN_PREFIX: char = '~';
/// Prefix introducing an annotation element.
pub const ANNOT_PREFIX: char = '@';
/// Prefix introducing a constraint.
pub const CONSTRAINT_PREFIX: char = '#';

pub const CONSTRAINT_PARENT: &str = "parent";
pub const CONSTRAINT_CONTAINS: &str = "contains";

/// What kind of posting stream a query element reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// A surface token of the annotated text field.
    Token,
    /// An annotation label of the annotations field.
    Annotation,
}

/// Relation a constraint imposes between a head and a dependent element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// The dependent's `parent_id` must equal the head's `id`.
    Parent,
    /// The head's span must cover the dependent's span.
    Contains,
}

/// One node of the query graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryElement {
    /// Surface string queried (lowercased for annotations).
    pub token: String,
    pub kind: ElementKind,
    /// Label constraints refer to; empty if the element is unlabeled.
    pub label: String,
    /// Size of the element's connected component in the undirected
    /// constraint graph. Edge-less elements keep 0, not 1: the cost
    /// ordering depends on that value and changing it would reorder
    /// executions, so the historical behavior is preserved.
    pub connect_qty: usize,
    /// Identifier of the element's connected component.
    pub component_id: usize,
}

impl QueryElement {
    pub fn is_labeled(&self) -> bool {
        !self.label.is_empty()
    }
}

/// A directed constraint edge between two elements, by element index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintEdge {
    /// The constraining element.
    pub head: usize,
    /// The constrained element.
    pub dependent: usize,
    pub kind: ConstraintKind,
}

/// A parsed query: elements plus the constraint-edge multiset.
///
/// Immutable after parsing and freely shareable across concurrent query
/// executions; per-execution state lives in the engine's posting states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub elements: Vec<QueryElement>,
    pub constraints: Vec<ConstraintEdge>,
}

impl CompiledQuery {
    /// Number of query elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
