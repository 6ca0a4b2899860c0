//! Task card and project member types

use super::ids::{ColumnId, TaskId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Task priority as sent by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A task card on the board.
///
/// Only `column_id` is placement state owned by the reordering engine; the
/// rest is carried through from the server. `position` is the server's
/// intra-column hint and is never renumbered locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub column_id: ColumnId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Display name derived from the project user list, never sent to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, column_id: impl Into<ColumnId>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            column_id: column_id.into(),
            position: None,
            priority: Priority::default(),
            assignee_id: None,
            due_date: None,
            assignee_name: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<UserId>) -> Self {
        self.assignee_id = Some(assignee.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Re-derive `assignee_name` from the given member list
    pub fn enrich(&mut self, users: &[User]) {
        self.assignee_name = self
            .assignee_id
            .and_then(|id| users.iter().find(|u| u.id == id))
            .map(User::display_name);
    }
}

/// Body of an `update_task` call when re-parenting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub column_id: ColumnId,
}

/// A project member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(
        id: impl Into<UserId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
