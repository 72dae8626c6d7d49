//! Structured-query parser.
//!
//! The surface language is whitespace-delimited: `~label:surface` queries a
//! text token, `@label:surface` an annotation, and
//! `#name(head,dep1,...,depN)` adds `parent` or `contains` constraints
//! between labeled elements. Parsing is two-pass: all lexical elements are
//! collected first so the label table is complete before any constraint is
//! resolved.

use std::collections::HashMap;

use crate::compiler::ast::{
    CompiledQuery, ConstraintEdge, ConstraintKind, ElementKind, QueryElement, ANNOT_PREFIX,
    CONSTRAINT_CONTAINS, CONSTRAINT_PARENT, CONSTRAINT_PREFIX, TOKEN_PREFIX,
};
use crate::error::{EngineError, Result};

const CONSTRAINT_FORMAT: &str = "#<name>(<head label>,<dependent label 1>,...,<dependent label N>)";

/// Parser for the structured-query mini-language.
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a query string into a [`CompiledQuery`].
    pub fn parse(&self, query: &str) -> Result<CompiledQuery> {
        let mut elements: Vec<QueryElement> = Vec::new();
        let mut label_to_id: HashMap<String, usize> = HashMap::new();
        let mut deferred_constraints: Vec<&str> = Vec::new();

        // First pass: lexical elements; constraints wait until the label
        // table is complete.
        for tok in query.split_whitespace() {
            if tok.starts_with(CONSTRAINT_PREFIX) {
                deferred_constraints.push(tok);
            } else if let Some(rest) = tok.strip_prefix(TOKEN_PREFIX) {
                add_element(&mut elements, &mut label_to_id, tok, rest, ElementKind::Token)?;
            } else if let Some(rest) = tok.strip_prefix(ANNOT_PREFIX) {
                add_element(
                    &mut elements,
                    &mut label_to_id,
                    tok,
                    rest,
                    ElementKind::Annotation,
                )?;
            } else {
                return Err(EngineError::Syntax(format!(
                    "bad token '{tok}', should start with {CONSTRAINT_PREFIX}, {TOKEN_PREFIX}, or {ANNOT_PREFIX}"
                )));
            }
        }

        if elements.is_empty() {
            return Err(EngineError::Syntax("query has no elements".to_string()));
        }

        // Second pass: constraints and the undirected adjacency they induce.
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); elements.len()];
        let mut constraints: Vec<ConstraintEdge> = Vec::new();
        for tok in deferred_constraints {
            parse_constraint(tok, &label_to_id, &mut edges, &mut constraints)?;
        }

        assign_components(&mut elements, &edges);

        Ok(CompiledQuery {
            elements,
            constraints,
        })
    }
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

fn check_label(tok: &str, label: &str) -> Result<()> {
    if label
        .chars()
        .any(|c| c == ',' || c == '(' || c == ')' || c.is_whitespace())
    {
        return Err(EngineError::Syntax(format!(
            "label '{label}' in token '{tok}' contains a reserved character"
        )));
    }
    Ok(())
}

fn add_element(
    elements: &mut Vec<QueryElement>,
    label_to_id: &mut HashMap<String, usize>,
    tok: &str,
    rest: &str,
    kind: ElementKind,
) -> Result<()> {
    let colon = rest.find(':').ok_or_else(|| {
        EngineError::Syntax(format!(
            "bad token '{tok}', missing colon after the element label"
        ))
    })?;
    let label = &rest[..colon];
    check_label(tok, label)?;

    let surface = &rest[colon + 1..];
    // Annotation labels are lowercased at index time; match that here.
    let token = match kind {
        ElementKind::Token => surface.to_string(),
        ElementKind::Annotation => surface.to_lowercase(),
    };

    let id = elements.len();
    if !label.is_empty() {
        if label_to_id.insert(label.to_string(), id).is_some() {
            return Err(EngineError::Syntax(format!("duplicate label: '{label}'")));
        }
    }
    elements.push(QueryElement {
        token,
        kind,
        label: label.to_string(),
        connect_qty: 0,
        component_id: 0,
    });
    Ok(())
}

fn parse_constraint(
    tok: &str,
    label_to_id: &HashMap<String, usize>,
    edges: &mut [Vec<usize>],
    constraints: &mut Vec<ConstraintEdge>,
) -> Result<()> {
    if !tok.ends_with(')') {
        return Err(EngineError::Syntax(format!(
            "wrong format for the constraint '{tok}', expected format: {CONSTRAINT_FORMAT}"
        )));
    }
    let open = tok.find('(').ok_or_else(|| {
        EngineError::Syntax(format!(
            "missing '(' in the constraint '{tok}', expected format: {CONSTRAINT_FORMAT}"
        ))
    })?;

    let name = &tok[1..open];
    let kind = if name.eq_ignore_ascii_case(CONSTRAINT_CONTAINS) {
        ConstraintKind::Contains
    } else if name.eq_ignore_ascii_case(CONSTRAINT_PARENT) {
        ConstraintKind::Parent
    } else {
        return Err(EngineError::Syntax(format!(
            "wrong constraint name '{name}' in '{tok}'"
        )));
    };

    // Labels cannot contain commas, so a plain split is unambiguous.
    let parts: Vec<&str> = tok[open + 1..tok.len() - 1].split(',').collect();
    if parts.len() < 2 {
        return Err(EngineError::Syntax(format!(
            "there should be at least 2 labels between '(' and ')' in the constraint '{tok}'"
        )));
    }

    let resolve = |label: &str| -> Result<usize> {
        label_to_id.get(label.trim()).copied().ok_or_else(|| {
            EngineError::Syntax(format!(
                "cannot find an element for the label '{}', constraint '{tok}'",
                label.trim()
            ))
        })
    };

    let head = resolve(parts[0])?;
    for dep_label in &parts[1..] {
        let dependent = resolve(dep_label)?;
        constraints.push(ConstraintEdge {
            head,
            dependent,
            kind,
        });
        // Linear containment scan; query graphs are tiny.
        if !edges[dependent].contains(&head) {
            edges[dependent].push(head);
        }
        if !edges[head].contains(&dependent) {
            edges[head].push(dependent);
        }
    }
    Ok(())
}

/// Assign component ids and connected-component sizes by iterative DFS.
///
/// Elements with no constraint edges keep `connect_qty == 0`.
fn assign_components(elements: &mut [QueryElement], edges: &[Vec<usize>]) {
    let mut visited = vec![false; elements.len()];
    let mut component_id = 0;
    let mut stack: Vec<usize> = Vec::new();
    let mut component: Vec<usize> = Vec::new();

    for start in 0..elements.len() {
        if visited[start] {
            continue;
        }
        component.clear();
        stack.push(start);
        visited[start] = true;
        while let Some(node) = stack.pop() {
            component.push(node);
            for &next in &edges[node] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        for &node in &component {
            elements[node].component_id = component_id;
            elements[node].connect_qty = if edges[node].is_empty() {
                0
            } else {
                component.len()
            };
        }
        component_id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Result<CompiledQuery> {
        QueryParser::new().parse(query)
    }

    // ==================== Valid Query Tests ====================

    #[test]
    fn test_parse_single_token() {
        let q = parse("~w:cat").unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.elements[0].token, "cat");
        assert_eq!(q.elements[0].kind, ElementKind::Token);
        assert_eq!(q.elements[0].label, "w");
        assert_eq!(q.elements[0].connect_qty, 0);
        assert!(q.constraints.is_empty());
    }

    #[test]
    fn test_parse_annotation_surface_is_lowercased() {
        let q = parse("@n:NP").unwrap();
        assert_eq!(q.elements[0].token, "np");
        assert_eq!(q.elements[0].kind, ElementKind::Annotation);
    }

    #[test]
    fn test_parse_unlabeled_element() {
        let q = parse("~:cat ~:dog").unwrap();
        assert_eq!(q.len(), 2);
        assert!(!q.elements[0].is_labeled());
        assert!(!q.elements[1].is_labeled());
    }

    #[test]
    fn test_parse_contains_constraint() {
        let q = parse("@s:sent @w:cat #contains(s,w)").unwrap();
        assert_eq!(q.constraints.len(), 1);
        assert_eq!(
            q.constraints[0],
            ConstraintEdge {
                head: 0,
                dependent: 1,
                kind: ConstraintKind::Contains
            }
        );
        assert_eq!(q.elements[0].connect_qty, 2);
        assert_eq!(q.elements[1].connect_qty, 2);
        assert_eq!(q.elements[0].component_id, q.elements[1].component_id);
    }

    #[test]
    fn test_parse_constraint_name_case_insensitive() {
        let q = parse("@a:x @b:y #Parent(a,b) #CONTAINS(a,b)").unwrap();
        assert_eq!(q.constraints[0].kind, ConstraintKind::Parent);
        assert_eq!(q.constraints[1].kind, ConstraintKind::Contains);
    }

    #[test]
    fn test_parse_multi_dependent_constraint_fans_out() {
        let q = parse("@a:x @b:y @c:z #parent(a,b,c)").unwrap();
        assert_eq!(q.constraints.len(), 2);
        assert_eq!(q.constraints[0].dependent, 1);
        assert_eq!(q.constraints[1].dependent, 2);
        for e in &q.elements {
            assert_eq!(e.connect_qty, 3);
        }
    }

    #[test]
    fn test_parse_isolated_nodes_keep_zero_connect_qty() {
        let q = parse("~w:cat ~x:dog @s:sent @n:np #contains(s,n)").unwrap();
        assert_eq!(q.elements[0].connect_qty, 0);
        assert_eq!(q.elements[1].connect_qty, 0);
        assert_eq!(q.elements[2].connect_qty, 2);
        assert_eq!(q.elements[3].connect_qty, 2);
        // Components are distinct even for isolated nodes.
        assert_ne!(q.elements[0].component_id, q.elements[1].component_id);
        assert_ne!(q.elements[0].component_id, q.elements[2].component_id);
    }

    #[test]
    fn test_parse_chained_constraints_form_one_component() {
        let q = parse("@vp:vp @np:np @det:det #contains(vp,np) #parent(np,det)").unwrap();
        assert_eq!(q.constraints.len(), 2);
        for e in &q.elements {
            assert_eq!(e.connect_qty, 3);
            assert_eq!(e.component_id, q.elements[0].component_id);
        }
    }

    #[test]
    fn test_parse_duplicate_edges_counted_once_for_connectivity() {
        let q = parse("@a:x @b:y #parent(a,b) #contains(a,b)").unwrap();
        assert_eq!(q.constraints.len(), 2);
        assert_eq!(q.elements[0].connect_qty, 2);
        assert_eq!(q.elements[1].connect_qty, 2);
    }

    // ==================== Error Handling Tests ====================

    #[test]
    fn test_parse_rejects_empty_query() {
        assert!(matches!(parse(""), Err(EngineError::Syntax(_))));
        assert!(matches!(parse("   "), Err(EngineError::Syntax(_))));
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert!(matches!(parse("cat"), Err(EngineError::Syntax(_))));
    }

    #[test]
    fn test_parse_rejects_missing_colon() {
        assert!(matches!(parse("~wcat"), Err(EngineError::Syntax(_))));
        assert!(matches!(parse("@sent"), Err(EngineError::Syntax(_))));
    }

    #[test]
    fn test_parse_rejects_duplicate_label() {
        assert!(matches!(
            parse("~w:cat ~w:dog"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_label_characters() {
        assert!(matches!(parse("~a(b:cat"), Err(EngineError::Syntax(_))));
        assert!(matches!(parse("~a)b:cat"), Err(EngineError::Syntax(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_constraint_name() {
        assert!(matches!(
            parse("@a:x @b:y #overlaps(a,b)"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_label_reference() {
        assert!(matches!(
            parse("@a:x #contains(a,zzz)"),
            Err(EngineError::Syntax(_))
        ));
        assert!(matches!(
            parse("@a:x #contains(zzz,a)"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_rejects_too_few_constraint_labels() {
        assert!(matches!(
            parse("@a:x #contains(a)"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unterminated_constraint() {
        assert!(matches!(
            parse("@a:x @b:y #contains(a,b"),
            Err(EngineError::Syntax(_))
        ));
        assert!(matches!(
            parse("@a:x @b:y #containsa,b)"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_constraint_may_precede_elements() {
        // Constraints are resolved after all elements, so order in the
        // query string does not matter.
        let q = parse("#contains(s,w) @s:sent ~w:cat").unwrap();
        assert_eq!(q.constraints.len(), 1);
        assert_eq!(q.constraints[0].head, 0);
        assert_eq!(q.constraints[0].dependent, 1);
    }
}
