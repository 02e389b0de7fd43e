//! Pure batch-deduplication logic for membership writes.

use std::collections::HashSet;
use uuid::Uuid;

/// Returns the ids from `batch` that are not already in `existing`,
/// preserving batch order.
///
/// Also collapses duplicate ids within the batch itself, so the result can
/// be written as one bulk insert. This filter is an optimization only; the
/// membership store's uniqueness constraint is what guarantees no duplicate
/// rows under concurrent writers.
pub fn missing_members(batch: &[Uuid], existing: &HashSet<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(batch.len());
    batch
        .iter()
        .copied()
        .filter(|id| !existing.contains(id) && seen.insert(*id))
        .collect()
}
