//! Board model: the in-memory `(columns, tasks, users)` snapshot for one project.
//!
//! Two invariants hold after every completed operation:
//!
//! - **Dense positions**: column positions are exactly `0..N`, and `columns`
//!   is kept in position order.
//! - **Referential integrity**: every task's `column_id` names a column of
//!   the snapshot.
//!
//! The snapshot may be transiently inconsistent between an optimistic update
//! and its reconciliation; [`BoardSnapshot::check_invariants`] is what the
//! reconciler uses to decide whether a merged model must be resynced.

use crate::error::{BoardError, Result};
use crate::types::{Column, ColumnId, ProjectId, Task, TaskId, User};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Plain board data, cheap to clone and compare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub columns: Vec<Column>,
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
}

impl BoardSnapshot {
    /// Build a snapshot from the server triple: columns are sorted by
    /// position and every task gets its `assignee_name` derived.
    pub fn from_parts(mut columns: Vec<Column>, mut tasks: Vec<Task>, users: Vec<User>) -> Self {
        columns.sort_by_key(|c| c.position);
        for task in &mut tasks {
            task.enrich(&users);
        }
        Self {
            columns,
            tasks,
            users,
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Index of a column in display order
    pub fn column_index(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks of one column, in server order
    pub fn tasks_in_column(&self, column: ColumnId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.column_id == column)
    }

    /// Check that positions are `0..N` in array order
    pub fn has_dense_positions(&self) -> bool {
        self.columns
            .iter()
            .enumerate()
            .all(|(index, column)| column.position == index)
    }

    /// Verify both board invariants
    pub fn check_invariants(&self) -> Result<()> {
        if !self.has_dense_positions() {
            let positions: Vec<usize> = self.columns.iter().map(|c| c.position).collect();
            return Err(BoardError::invariant(format!(
                "column positions {:?} are not a dense permutation",
                positions
            )));
        }

        if let Some(orphan) = self
            .tasks
            .iter()
            .find(|t| self.column(t.column_id).is_none())
        {
            return Err(BoardError::invariant(format!(
                "task {} references missing column {}",
                orphan.id, orphan.column_id
            )));
        }

        Ok(())
    }
}

/// The live model for the selected project.
///
/// `epoch` counts wholesale replacements. A reconciliation remembers the
/// epoch it started in; if a resync landed in the meantime its merge is
/// discarded.
#[derive(Debug, Clone)]
pub struct BoardModel {
    project_id: ProjectId,
    snapshot: BoardSnapshot,
    epoch: u64,
}

impl BoardModel {
    pub fn new(project_id: ProjectId, snapshot: BoardSnapshot) -> Self {
        Self {
            project_id,
            snapshot,
            epoch: 0,
        }
    }

    /// Start counting from `epoch`, so jobs issued against an earlier load of
    /// the same project can never match this model.
    pub fn starting_at(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn snapshot(&self) -> &BoardSnapshot {
        &self.snapshot
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Install an optimistic snapshot. Does not advance the epoch.
    pub fn apply(&mut self, snapshot: BoardSnapshot) {
        self.snapshot = snapshot;
    }

    /// Replace the model wholesale with server truth.
    pub fn resync(&mut self, snapshot: BoardSnapshot) {
        self.snapshot = snapshot;
        self.epoch += 1;
        debug!(project = %self.project_id, epoch = self.epoch, "board model resynced");
    }

    /// Merge canonical columns by id, touching only name, color and position.
    pub fn merge_columns(&mut self, canonical: &[Column]) -> Result<()> {
        for incoming in canonical {
            let column = self
                .snapshot
                .columns
                .iter_mut()
                .find(|c| c.id == incoming.id)
                .ok_or(BoardError::ColumnNotFound { id: incoming.id })?;
            column.name = incoming.name.clone();
            column.color = incoming.color.clone();
            column.position = incoming.position;
        }
        self.snapshot.columns.sort_by_key(|c| c.position);
        Ok(())
    }

    /// Merge one canonical task, re-deriving its assignee name from the
    /// last-known user list. Other tasks are untouched.
    pub fn merge_task(&mut self, mut canonical: Task) -> Result<()> {
        canonical.enrich(&self.snapshot.users);
        let task = self
            .snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == canonical.id)
            .ok_or(BoardError::TaskNotFound { id: canonical.id })?;
        *task = canonical;
        Ok(())
    }
}

/// The controller's model slot, shared with in-flight reconciliation jobs.
/// Empty while no project is loaded.
///
/// The lock is synchronous; never hold the guard across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard(Arc<Mutex<Option<BoardModel>>>);

impl SharedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<BoardModel>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current snapshot, if a project is loaded
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.lock().as_ref().map(|m| m.snapshot().clone())
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.lock().as_ref().map(BoardModel::project_id)
    }

    pub fn epoch(&self) -> Option<u64> {
        self.lock().as_ref().map(BoardModel::epoch)
    }
}
