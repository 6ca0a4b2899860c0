//! Drag session data

use crate::types::{ColumnId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DragEntity {
    Task(TaskId),
    Column(ColumnId),
}

impl fmt::Display for DragEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragEntity::Task(id) => write!(f, "task {}", id),
            DragEntity::Column(id) => write!(f, "column {}", id),
        }
    }
}

/// Where the dragged entity started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragOrigin {
    /// A task's column at pointer-down
    Column(ColumnId),
    /// A column's position at pointer-down
    Position(usize),
}

/// What the pointer is currently over, as reported by hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum HitTarget {
    Column(ColumnId),
    Task(TaskId),
}

/// An open drag gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub entity: DragEntity,
    pub origin: DragOrigin,
    /// Latest hit-test result, `None` when over no drop surface
    pub target: Option<HitTarget>,
    /// Column shown as "would land here"
    pub indicator: Option<ColumnId>,
}

impl DragSession {
    pub fn new(entity: DragEntity, origin: DragOrigin) -> Self {
        Self {
            entity,
            origin,
            target: None,
            indicator: None,
        }
    }
}

/// Result of closing a session on pointer-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedDrag {
    pub entity: DragEntity,
    pub origin: DragOrigin,
    pub target: Option<HitTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_display() {
        assert_eq!(DragEntity::Task(TaskId::new(4)).to_string(), "task 4");
        assert_eq!(DragEntity::Column(ColumnId::new(2)).to_string(), "column 2");
    }

    #[test]
    fn test_hit_target_is_tagged() {
        let json = serde_json::to_value(HitTarget::Task(TaskId::new(9))).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "task", "id": 9 }));
    }
}
