//! Structured documents: flat `{key: string}` content edited by independent
//! section widgets.

pub mod document;
pub mod keys;
pub mod merge;
pub mod vocabulary;

pub use document::{Sections, StructuredDocument, StructuredError};
pub use merge::{merge, MergeOutcome, MergeStatus, PartialUpdate, DELETION_MARKER};
pub use vocabulary::Vocabulary;
