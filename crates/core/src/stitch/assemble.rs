//! Pure re-assembly of child rows onto an ordered batch of parents.

use std::collections::HashMap;

use super::{ChildRow, Entity, ParentId, PluralAssociation, Result, StitchError};

/// Collects parent identifiers in input order.
pub fn parent_ids<A: PluralAssociation>(parents: &[A::Parent]) -> Vec<ParentId<A>> {
    parents.iter().map(|parent| parent.id()).collect()
}

/// Routes every child row to its parent and attaches the collections.
///
/// The output has the same length and order as `parents`, whatever order the
/// rows arrive in. Children of the same parent keep their relative row order.
/// A parent without rows receives an empty collection.
///
/// Runs in O(N + M) for N parents and M rows: one position index, one pass
/// over the rows.
///
/// Parent identifiers must be unique within the batch. With duplicates the
/// rows are attached to only one of the copies.
///
/// # Errors
///
/// Returns [`StitchError::OrphanRow`] if a row names a parent that is not in
/// the batch.
pub fn assemble<A: PluralAssociation>(
    mut parents: Vec<A::Parent>,
    rows: Vec<ChildRow<ParentId<A>, A::Child>>,
) -> Result<Vec<A::Parent>> {
    let positions: HashMap<ParentId<A>, usize> = parents
        .iter()
        .enumerate()
        .map(|(position, parent)| (parent.id(), position))
        .collect();

    let mut slots: Vec<Vec<A::Child>> = std::iter::repeat_with(Vec::new)
        .take(parents.len())
        .collect();

    for row in rows {
        let Some(&position) = positions.get(&row.parent_id) else {
            return Err(StitchError::OrphanRow {
                association: A::NAME,
                parent_id: row.parent_id.to_string(),
            });
        };
        slots[position].push(row.child);
    }

    for (parent, children) in parents.iter_mut().zip(slots) {
        A::attach(parent, children);
    }

    Ok(parents)
}
