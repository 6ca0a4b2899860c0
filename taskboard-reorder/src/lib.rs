//! Drag-and-drop reordering engine for a remote task board
//!
//! This crate keeps an in-memory copy of one project's board (columns, tasks
//! and project members) and lets a user rearrange it by dragging: tasks move
//! between columns, columns change order. Every drop is applied locally at
//! once and then persisted to the server, which stays the source of truth.
//!
//! ## Overview
//!
//! - **Optimistic** - the model changes on pointer-up, before any request
//! - **Server wins** - a failed write is undone by refetching the whole board
//! - **Dense column order** - column positions are always `0..N` after a reorder
//! - **Overlay-safe** - no drag can start while a task editor is open
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskboard_reorder::{
//!     BoardConfig, BoardController, ColumnId, DragEntity, HitTarget, InMemoryBoardApi, TaskId,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(InMemoryBoardApi::new());
//! let mut board = BoardController::new(api, BoardConfig::default())?;
//! board.load_project(1).await?;
//!
//! // Pointer-down, pointer-move, pointer-up
//! board.on_drag_start(DragEntity::Task(TaskId::new(42)));
//! board.on_drag_over(Some(HitTarget::Column(ColumnId::new(7))));
//! if let Some(job) = board.on_drag_end() {
//!     tokio::spawn(job.run());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Data flow
//!
//! ```text
//! pointer-down ─▶ DragTracker::begin
//! pointer-move ─▶ resolver::resolve ─▶ "would land here" indicator
//! pointer-up   ─▶ resolver::resolve ─▶ mutator::apply ─▶ BoardModel
//!                                                   └──▶ ReconcileJob::run
//!                                                          ├─ ok:  merge canonical records
//!                                                          └─ err: full resync
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod drag;
mod error;
pub mod events;
pub mod filter;
pub mod guard;
pub mod memory;
pub mod model;
pub mod mutator;
pub mod reconcile;
pub mod resolver;
pub mod types;

pub use api::BoardApi;
pub use config::BoardConfig;
pub use controller::BoardController;
pub use drag::{DragEntity, DragOrigin, DragSession, DragTracker, FinishedDrag, HitTarget};
pub use error::{BoardError, Result};
pub use events::{BoardEvent, EventBus};
pub use filter::BoardFilter;
pub use guard::{InputKind, OverlayGuard, OverlayToken};
pub use memory::{ApiCall, ApiOperation, FailureKind, InMemoryBoardApi};
pub use model::{BoardModel, BoardSnapshot, SharedBoard};
pub use reconcile::{ReconcileJob, ReconcileOutcome, Reconciler};
pub use resolver::{resolve, resolve_step, Direction, Resolution};

// Re-export commonly used types
pub use types::{
    Column, ColumnId, ColumnUpdate, Priority, ProjectId, Task, TaskId, TaskUpdate, User, UserId,
};
