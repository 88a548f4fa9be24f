//! Document versioning engine: an append-only snapshot history per document,
//! session-aware autosave, retention pruning and a merge engine for
//! structured section-based documents.

pub mod clock;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod events;
pub mod mutation;
pub mod store;
pub mod structured;
pub mod versioning;

pub use error::{VersioningError, VersioningResult};
