use std::collections::HashSet;

use crate::document::{DocumentId, Snapshot, SnapshotId};
use crate::mutation::{PrunePlan, Relink};

pub const DEFAULT_KEEP: usize = 20;

/// Work out which snapshots a retention pass removes.
///
/// `snapshots` must be ordered oldest first. The oldest `len - keep`
/// non-current snapshots are selected; survivors whose base is selected are
/// re-pointed at the oldest survivor (or cleared, if that survivor is
/// themselves). Returns `None` when nothing needs pruning.
pub fn plan_prune(document: DocumentId, snapshots: &[Snapshot], keep: usize) -> Option<PrunePlan> {
    let excess = snapshots.len().saturating_sub(keep);
    if excess == 0 {
        return None;
    }

    let doomed: HashSet<SnapshotId> = snapshots
        .iter()
        .filter(|s| !s.is_current)
        .take(excess)
        .map(|s| s.id)
        .collect();
    if doomed.is_empty() {
        return None;
    }

    let survivors: Vec<&Snapshot> = snapshots.iter().filter(|s| !doomed.contains(&s.id)).collect();
    let oldest_survivor = survivors.first().map(|s| s.id);

    let relinks = survivors
        .iter()
        .filter(|s| s.base_version_id.is_some_and(|b| doomed.contains(&b)))
        .map(|s| Relink {
            snapshot_id: s.id,
            new_base: oldest_survivor.filter(|&oldest| oldest != s.id),
        })
        .collect();

    Some(PrunePlan {
        document_id: document,
        relinks,
        deletions: snapshots
            .iter()
            .filter(|s| doomed.contains(&s.id))
            .map(|s| s.id)
            .collect(),
    })
}
