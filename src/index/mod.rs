pub mod memory;
pub mod postings;
pub mod schema;

pub use memory::{Annotation, MemoryIndex, MemoryIndexWriter};
pub use postings::{DocId, EmptyCursor, PostingsCursor, NO_MORE_DOCS};
pub use schema::{FieldConfig, SchemaConfig, DEFAULT_ANNOT_FIELD, DEFAULT_TEXT_FIELD};
