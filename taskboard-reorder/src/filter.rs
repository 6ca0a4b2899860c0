//! Task visibility filter applied by the board view before rendering.
//!
//! Filtering only hides cards; it never changes the model, so a drag over a
//! filtered board still resolves against every task.

use crate::model::BoardSnapshot;
use crate::types::{ColumnId, Priority, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardFilter {
    /// Case-insensitive substring of the task title
    pub query: String,
    /// Empty means every priority
    pub priorities: HashSet<Priority>,
    /// Empty means every column
    pub column_ids: HashSet<ColumnId>,
}

impl BoardFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priorities.insert(priority);
        self
    }

    pub fn with_column(mut self, column: impl Into<ColumnId>) -> Self {
        self.column_ids.insert(column.into());
        self
    }

    /// Whether the priority or column filters narrow the board
    pub fn is_applied(&self) -> bool {
        !self.priorities.is_empty() || !self.column_ids.is_empty()
    }

    /// Clear the priority and column filters, keeping the search query
    pub fn reset(&mut self) {
        self.priorities.clear();
        self.column_ids.clear();
    }

    pub fn matches(&self, task: &Task) -> bool {
        let query = self.query.to_lowercase();
        self.matches_lowercase(task, &query)
    }

    /// Tasks that pass the filter, in server order
    pub fn visible_tasks<'a>(&self, snapshot: &'a BoardSnapshot) -> Vec<&'a Task> {
        let query = self.query.to_lowercase();
        snapshot
            .tasks
            .iter()
            .filter(|task| self.matches_lowercase(task, &query))
            .collect()
    }

    fn matches_lowercase(&self, task: &Task, query: &str) -> bool {
        task.title.to_lowercase().contains(query)
            && (self.priorities.is_empty() || self.priorities.contains(&task.priority))
            && (self.column_ids.is_empty() || self.column_ids.contains(&task.column_id))
    }
}
