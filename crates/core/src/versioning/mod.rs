//! Snapshot lifecycle: creation, saves, restores, autosave decisions and
//! retention.

pub mod diff;
pub mod lifecycle;
pub mod retention;
pub mod session;

pub use diff::VersionDiff;
pub use lifecycle::{AutosaveOutcome, NewDocument, VersionManager};
pub use session::{AutosaveDecision, BranchReason, SessionPolicy};
