//! Core types for the board engine

mod column;
mod ids;
mod task;

// Re-export all types
pub use column::{Column, ColumnUpdate};
pub use ids::{ColumnId, ProjectId, TaskId, UserId};
pub use task::{Priority, Task, TaskUpdate, User};
