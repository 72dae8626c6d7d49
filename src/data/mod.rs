pub mod reader;

pub use reader::{AnnotatedDocument, AnnotationEntry, CorpusReader};
