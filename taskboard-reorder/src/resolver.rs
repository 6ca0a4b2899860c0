//! Target resolution: turn a raw hit-test result into a board-level intent.
//!
//! Pure function over the live snapshot. Anything ambiguous or stale resolves
//! to [`Resolution::Noop`] so a gesture is simply inert instead of failing.

use crate::drag::{DragEntity, HitTarget};
use crate::model::BoardSnapshot;
use crate::types::{ColumnId, TaskId};
use serde::{Deserialize, Serialize};

/// What a drop would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Nothing changes: same column, self-drop, or a stale reference
    Noop,
    /// Move `column` to the slot of `target`
    ReorderColumn { column: ColumnId, target: ColumnId },
    /// Re-parent `task` from `from` into `to`
    MoveTask {
        task: TaskId,
        from: ColumnId,
        to: ColumnId,
    },
}

impl Resolution {
    /// Destination column, `None` for a no-op
    pub fn target_column_id(&self) -> Option<ColumnId> {
        match self {
            Resolution::Noop => None,
            Resolution::ReorderColumn { target, .. } => Some(*target),
            Resolution::MoveTask { to, .. } => Some(*to),
        }
    }

    pub fn is_column_reorder(&self) -> bool {
        matches!(self, Resolution::ReorderColumn { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Resolution::Noop)
    }
}

/// One-slot move of a column from the column settings list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards position 0
    Up,
    /// Towards the last position
    Down,
}

/// Swap `column` with its neighbour in `direction`. A no-op at either end
/// of the board or for an unknown column.
pub fn resolve_step(column: ColumnId, direction: Direction, snapshot: &BoardSnapshot) -> Resolution {
    let Some(index) = snapshot.column_index(column) else {
        return Resolution::Noop;
    };
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1),
    };
    match neighbour.and_then(|i| snapshot.columns.get(i)) {
        Some(target) => Resolution::ReorderColumn {
            column,
            target: target.id,
        },
        None => Resolution::Noop,
    }
}

/// Resolve a hit-test result for the dragged entity against the snapshot.
pub fn resolve(entity: DragEntity, hit: Option<HitTarget>, snapshot: &BoardSnapshot) -> Resolution {
    let Some(hit) = hit else {
        return Resolution::Noop;
    };

    match entity {
        DragEntity::Column(column) => resolve_column(column, hit, snapshot),
        DragEntity::Task(task) => resolve_task(task, hit, snapshot),
    }
}

fn resolve_column(column: ColumnId, hit: HitTarget, snapshot: &BoardSnapshot) -> Resolution {
    // Columns only reorder over other columns
    let HitTarget::Column(target) = hit else {
        return Resolution::Noop;
    };
    if column == target || snapshot.column(column).is_none() || snapshot.column(target).is_none() {
        return Resolution::Noop;
    }
    Resolution::ReorderColumn { column, target }
}

fn resolve_task(task: TaskId, hit: HitTarget, snapshot: &BoardSnapshot) -> Resolution {
    let Some(current) = snapshot.task(task) else {
        return Resolution::Noop;
    };

    let destination = match hit {
        HitTarget::Column(id) => snapshot.column(id).map(|c| c.id),
        // Dropping near a task means dropping into that task's column
        HitTarget::Task(over) => snapshot
            .task(over)
            .and_then(|t| snapshot.column(t.column_id))
            .map(|c| c.id),
    };

    match destination {
        Some(to) if to != current.column_id => Resolution::MoveTask {
            task,
            from: current.column_id,
            to,
        },
        _ => Resolution::Noop,
    }
}
