//! Remote board store interface.
//!
//! The server owns the data. Every write returns the canonical record, which
//! the reconciler merges back into the local model.

use crate::error::Result;
use crate::types::{Column, ColumnId, ColumnUpdate, ProjectId, Task, TaskId, TaskUpdate, User};
use async_trait::async_trait;

/// Request/response access to a project's board on the server
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Persist one column's name, position and color
    async fn update_column(
        &self,
        project_id: ProjectId,
        column_id: ColumnId,
        update: ColumnUpdate,
    ) -> Result<Column>;

    /// Re-parent one task
    async fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        update: TaskUpdate,
    ) -> Result<Task>;

    async fn get_columns(&self, project_id: ProjectId) -> Result<Vec<Column>>;

    async fn get_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>>;

    async fn get_project_users(&self, project_id: ProjectId) -> Result<Vec<User>>;
}
