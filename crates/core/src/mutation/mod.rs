pub mod types;

pub use types::{InPlaceUpdate, PrunePlan, PruneReport, Relink, SnapshotTransition};
