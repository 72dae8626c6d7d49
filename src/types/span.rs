use serde::{Deserialize, Serialize};

/// One occurrence of a query element inside a document.
///
/// Offsets are character offsets into the document text; `end_offset` is the
/// offset of the occurrence's last character, so `start_offset <= end_offset`
/// always holds. Plain text tokens carry zero `id` and `parent_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpan {
    /// Annotation id of this occurrence (0 for plain tokens).
    pub id: u32,
    /// Annotation id of the syntactic parent (0 if none).
    pub parent_id: u32,
    pub start_offset: u32,
    pub end_offset: u32,
}

impl ElementSpan {
    /// A plain token span with no annotation ids.
    pub fn token(start_offset: u32, end_offset: u32) -> Self {
        Self {
            id: 0,
            parent_id: 0,
            start_offset,
            end_offset,
        }
    }

    /// An annotation span with its own id and a parent id.
    pub fn annotation(id: u32, parent_id: u32, start_offset: u32, end_offset: u32) -> Self {
        Self {
            id,
            parent_id,
            start_offset,
            end_offset,
        }
    }

    /// True if this span covers `other` entirely.
    pub fn contains(&self, other: &ElementSpan) -> bool {
        self.start_offset <= other.start_offset && other.end_offset <= self.end_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_inclusive_boundaries() {
        let sent = ElementSpan::annotation(5, 0, 0, 20);
        assert!(sent.contains(&ElementSpan::token(0, 20)));
        assert!(sent.contains(&ElementSpan::token(4, 6)));
        assert!(sent.contains(&ElementSpan::token(20, 20)));
        assert!(!sent.contains(&ElementSpan::token(18, 21)));
        assert!(!sent.contains(&ElementSpan::token(30, 32)));
    }

    #[test]
    fn test_token_has_zero_ids() {
        let tok = ElementSpan::token(4, 6);
        assert_eq!(tok.id, 0);
        assert_eq!(tok.parent_id, 0);
    }
}
