//! Optimistic mutation: compute the next snapshot for a resolved drop.
//!
//! Runs synchronously on pointer-up, before any network call. The input
//! snapshot is never modified.

use crate::model::BoardSnapshot;
use crate::resolver::Resolution;
use crate::types::{Column, ColumnId, TaskId};
use tracing::trace;

/// Compute the optimistic snapshot for `resolution`.
///
/// A no-op, or a resolution whose ids are no longer in the snapshot, yields
/// an unchanged copy.
pub fn apply(snapshot: &BoardSnapshot, resolution: &Resolution) -> BoardSnapshot {
    let mut next = snapshot.clone();
    match *resolution {
        Resolution::Noop => {}
        Resolution::ReorderColumn { column, target } => move_column(&mut next, column, target),
        Resolution::MoveTask { task, to, .. } => move_task(&mut next, task, to),
    }
    next
}

/// Move `column` into the slot of `target`, then renumber every column.
///
/// The moved column lands after the target when dragged rightwards and
/// before it when dragged leftwards.
fn move_column(snapshot: &mut BoardSnapshot, column: ColumnId, target: ColumnId) {
    let (Some(from), Some(to)) = (snapshot.column_index(column), snapshot.column_index(target))
    else {
        return;
    };

    let moved = snapshot.columns.remove(from);
    snapshot.columns.insert(to, moved);
    renumber(&mut snapshot.columns);
    trace!(%column, from, to, "column moved");
}

/// Set every column's position to its index, keeping the current order
pub fn renumber(columns: &mut [Column]) {
    for (index, column) in columns.iter_mut().enumerate() {
        column.position = index;
    }
}

fn move_task(snapshot: &mut BoardSnapshot, task: TaskId, to: ColumnId) {
    if let Some(card) = snapshot.tasks.iter_mut().find(|t| t.id == task) {
        card.column_id = to;
        trace!(%task, %to, "task re-parented");
    }
}
