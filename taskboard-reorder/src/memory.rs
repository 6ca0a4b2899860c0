//! In-memory board store.
//!
//! Keeps whole projects in memory behind a synchronous lock, records every
//! call it receives and can be told to fail or stall specific operations.
//! The test suite drives the engine through it, and it works as an offline
//! backend for hosts without a server.

use crate::api::BoardApi;
use crate::error::{BoardError, Result};
use crate::model::BoardSnapshot;
use crate::types::{Column, ColumnId, ColumnUpdate, ProjectId, Task, TaskId, TaskUpdate, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// The five remote operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    UpdateColumn,
    UpdateTask,
    GetColumns,
    GetTasks,
    GetProjectUsers,
}

impl ApiOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiOperation::UpdateColumn => "update_column",
            ApiOperation::UpdateTask => "update_task",
            ApiOperation::GetColumns => "get_columns",
            ApiOperation::GetTasks => "get_tasks",
            ApiOperation::GetProjectUsers => "get_project_users",
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded call, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    UpdateColumn {
        project_id: ProjectId,
        column_id: ColumnId,
        update: ColumnUpdate,
    },
    UpdateTask {
        project_id: ProjectId,
        task_id: TaskId,
        update: TaskUpdate,
    },
    GetColumns(ProjectId),
    GetTasks(ProjectId),
    GetProjectUsers(ProjectId),
}

impl ApiCall {
    pub fn operation(&self) -> ApiOperation {
        match self {
            ApiCall::UpdateColumn { .. } => ApiOperation::UpdateColumn,
            ApiCall::UpdateTask { .. } => ApiOperation::UpdateTask,
            ApiCall::GetColumns(_) => ApiOperation::GetColumns,
            ApiCall::GetTasks(_) => ApiOperation::GetTasks,
            ApiCall::GetProjectUsers(_) => ApiOperation::GetProjectUsers,
        }
    }
}

/// How an injected failure presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection-level failure
    Transport,
    /// Server answered with this status code
    Status(u16),
}

#[derive(Debug, Clone, Copy)]
struct Injection {
    kind: FailureKind,
    /// `None` fails every call until cleared
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct StoreState {
    projects: HashMap<ProjectId, BoardSnapshot>,
    calls: Vec<ApiCall>,
    failures: HashMap<ApiOperation, Injection>,
    latency: HashMap<ApiOperation, Duration>,
}

impl StoreState {
    fn take_failure(&mut self, op: ApiOperation) -> Option<BoardError> {
        let injection = *self.failures.get(&op)?;
        match injection.remaining {
            Some(0) => {
                self.failures.remove(&op);
                return None;
            }
            Some(1) => {
                self.failures.remove(&op);
            }
            Some(n) => {
                self.failures.insert(
                    op,
                    Injection {
                        remaining: Some(n - 1),
                        ..injection
                    },
                );
            }
            None => {}
        }
        Some(match injection.kind {
            FailureKind::Transport => BoardError::transport(op.as_str(), "injected transport failure"),
            FailureKind::Status(status) => {
                BoardError::rejected(op.as_str(), status, "injected rejection")
            }
        })
    }

    fn project_mut(&mut self, op: ApiOperation, project_id: ProjectId) -> Result<&mut BoardSnapshot> {
        self.projects
            .get_mut(&project_id)
            .ok_or_else(|| BoardError::rejected(op.as_str(), 404, format!("project {} not found", project_id)))
    }
}

/// [`BoardApi`] backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryBoardApi {
    state: Mutex<StoreState>,
}

impl InMemoryBoardApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project with server-side data
    pub fn with_project(
        self,
        project_id: impl Into<ProjectId>,
        columns: Vec<Column>,
        tasks: Vec<Task>,
        users: Vec<User>,
    ) -> Self {
        self.insert_project(project_id, columns, tasks, users);
        self
    }

    /// Create or replace a project's server-side data
    pub fn insert_project(
        &self,
        project_id: impl Into<ProjectId>,
        columns: Vec<Column>,
        tasks: Vec<Task>,
        users: Vec<User>,
    ) {
        let snapshot = BoardSnapshot {
            columns,
            tasks,
            users,
        };
        self.lock().projects.insert(project_id.into(), snapshot);
    }

    /// Server-side view of a project, columns in position order
    pub fn project(&self, project_id: impl Into<ProjectId>) -> Option<BoardSnapshot> {
        let state = self.lock();
        let stored = state.projects.get(&project_id.into())?;
        let mut columns = stored.columns.clone();
        columns.sort_by_key(|c| c.position);
        Some(BoardSnapshot {
            columns,
            tasks: stored.tasks.clone(),
            users: stored.users.clone(),
        })
    }

    /// Change server data behind the client's back, as another user would
    pub fn edit_project<F>(&self, project_id: impl Into<ProjectId>, edit: F) -> Result<()>
    where
        F: FnOnce(&mut BoardSnapshot),
    {
        let mut state = self.lock();
        let project = state.project_mut(ApiOperation::GetColumns, project_id.into())?;
        edit(project);
        Ok(())
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Number of calls received for one operation
    pub fn call_count(&self, op: ApiOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }

    /// Calls that write (`update_column`, `update_task`)
    pub fn write_calls(&self) -> Vec<ApiCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ApiCall::UpdateColumn { .. } | ApiCall::UpdateTask { .. }))
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Fail the next call of `op` with a transport error
    pub fn fail_next(&self, op: ApiOperation) {
        self.fail_times(op, 1);
    }

    /// Fail the next `times` calls of `op` with a transport error
    pub fn fail_times(&self, op: ApiOperation, times: usize) {
        self.inject(op, FailureKind::Transport, Some(times));
    }

    /// Fail every call of `op` until [`clear_failures`](Self::clear_failures)
    pub fn fail_always(&self, op: ApiOperation) {
        self.inject(op, FailureKind::Transport, None);
    }

    /// Answer the next call of `op` with an error status
    pub fn reject_next(&self, op: ApiOperation, status: u16) {
        self.inject(op, FailureKind::Status(status), Some(1));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Delay every call of `op` by `delay` before it is served
    pub fn set_latency(&self, op: ApiOperation, delay: Duration) {
        self.lock().latency.insert(op, delay);
    }

    fn inject(&self, op: ApiOperation, kind: FailureKind, remaining: Option<usize>) {
        self.lock().failures.insert(op, Injection { kind, remaining });
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call, wait out any configured latency, then surface an
    /// injected failure if one is armed.
    async fn enter(&self, call: ApiCall) -> Result<()> {
        let op = call.operation();
        let delay = {
            let mut state = self.lock();
            trace!(%op, "in-memory store call");
            state.calls.push(call);
            state.latency.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().take_failure(op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BoardApi for InMemoryBoardApi {
    async fn update_column(
        &self,
        project_id: ProjectId,
        column_id: ColumnId,
        update: ColumnUpdate,
    ) -> Result<Column> {
        let op = ApiOperation::UpdateColumn;
        self.enter(ApiCall::UpdateColumn {
            project_id,
            column_id,
            update: update.clone(),
        })
        .await?;

        let mut state = self.lock();
        let project = state.project_mut(op, project_id)?;
        let column = project
            .columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| BoardError::rejected(op.as_str(), 404, format!("column {} not found", column_id)))?;
        column.name = update.name;
        column.position = update.position;
        column.color = update.color;
        Ok(column.clone())
    }

    async fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        update: TaskUpdate,
    ) -> Result<Task> {
        let op = ApiOperation::UpdateTask;
        self.enter(ApiCall::UpdateTask {
            project_id,
            task_id,
            update,
        })
        .await?;

        let mut state = self.lock();
        let project = state.project_mut(op, project_id)?;
        if !project.columns.iter().any(|c| c.id == update.column_id) {
            return Err(BoardError::rejected(
                op.as_str(),
                422,
                format!("column {} does not exist", update.column_id),
            ));
        }
        let task = project
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BoardError::rejected(op.as_str(), 404, format!("task {} not found", task_id)))?;
        task.column_id = update.column_id;
        let mut canonical = task.clone();
        // The server never returns the locally derived display name
        canonical.assignee_name = None;
        Ok(canonical)
    }

    async fn get_columns(&self, project_id: ProjectId) -> Result<Vec<Column>> {
        let op = ApiOperation::GetColumns;
        self.enter(ApiCall::GetColumns(project_id)).await?;
        let mut state = self.lock();
        Ok(state.project_mut(op, project_id)?.columns.clone())
    }

    async fn get_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        let op = ApiOperation::GetTasks;
        self.enter(ApiCall::GetTasks(project_id)).await?;
        let mut state = self.lock();
        let tasks = state
            .project_mut(op, project_id)?
            .tasks
            .iter()
            .cloned()
            .map(|mut t| {
                t.assignee_name = None;
                t
            })
            .collect();
        Ok(tasks)
    }

    async fn get_project_users(&self, project_id: ProjectId) -> Result<Vec<User>> {
        let op = ApiOperation::GetProjectUsers;
        self.enter(ApiCall::GetProjectUsers(project_id)).await?;
        let mut state = self.lock();
        Ok(state.project_mut(op, project_id)?.users.clone())
    }
}
