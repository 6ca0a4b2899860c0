//! Board controller: the single owner of the model, drag tracker, overlay
//! guard and reconciler for the selected project.
//!
//! Gesture callbacks are synchronous and never fail. A drop that changes the
//! board is applied to the model immediately and handed back as a
//! [`ReconcileJob`] for the host to spawn.

use crate::api::BoardApi;
use crate::config::BoardConfig;
use crate::drag::{DragEntity, DragOrigin, DragTracker, HitTarget};
use crate::error::{BoardError, Result};
use crate::events::{BoardEvent, EventBus};
use crate::filter::BoardFilter;
use crate::guard::{InputKind, OverlayGuard, OverlayToken};
use crate::model::{BoardModel, BoardSnapshot, SharedBoard};
use crate::mutator;
use crate::reconcile::{ReconcileJob, Reconciler};
use crate::resolver::{resolve, resolve_step, Direction, Resolution};
use crate::types::{ColumnId, ProjectId, Task};
use std::sync::Arc;
use taskboard_common::{Pretty, ValidatedConfig};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug)]
pub struct BoardController {
    board: SharedBoard,
    tracker: DragTracker,
    guard: OverlayGuard,
    reconciler: Arc<Reconciler>,
    events: EventBus,
    /// Highest epoch of any model this controller has torn down
    retired_epoch: u64,
}

impl BoardController {
    /// Create a controller with no project loaded. Fails if `config` does
    /// not validate.
    pub fn new(api: Arc<dyn BoardApi>, config: BoardConfig) -> Result<Self> {
        config.validate()?;
        let board = SharedBoard::new();
        let guard = OverlayGuard::new();
        let events = EventBus::new(config.event_capacity);
        let reconciler = Reconciler::new(api, board.clone(), events.clone(), config);
        Ok(Self {
            board,
            tracker: DragTracker::new(guard.clone()),
            guard,
            reconciler: Arc::new(reconciler),
            events,
            retired_epoch: 0,
        })
    }

    /// Fetch a project and make it the current board, replacing whatever
    /// was loaded. On failure no project is loaded.
    pub async fn load_project(&mut self, project_id: impl Into<ProjectId>) -> Result<()> {
        let project_id = project_id.into();
        self.unload();

        let snapshot = self.reconciler.fetch_consistent(project_id).await?;
        let (columns, tasks) = (snapshot.columns.len(), snapshot.tasks.len());
        let model = BoardModel::new(project_id, snapshot).starting_at(self.retired_epoch + 1);
        *self.board.lock() = Some(model);

        info!(project = %project_id, columns, tasks, "board loaded");
        self.events.emit(BoardEvent::Loaded {
            project_id,
            columns,
            tasks,
        });
        Ok(())
    }

    /// Tear down the current board. In-flight jobs for it settle into
    /// nothing.
    pub fn unload(&mut self) {
        self.tracker.cancel();
        if let Some(model) = self.board.lock().take() {
            self.retired_epoch = self.retired_epoch.max(model.epoch());
            debug!(project = %model.project_id(), "board unloaded");
        }
    }

    /// Replace the current board with server truth
    pub async fn refresh(&self) -> Result<()> {
        let project_id = self.board.project_id().ok_or(BoardError::NoProjectLoaded)?;
        self.reconciler.resync(project_id).await?;
        Ok(())
    }

    /// Pointer-down on a task or column. Returns whether a session opened.
    pub fn on_drag_start(&mut self, entity: DragEntity) -> bool {
        let origin = {
            let slot = self.board.lock();
            let Some(model) = slot.as_ref() else {
                debug!(%entity, "drag ignored: no board loaded");
                return false;
            };
            let snapshot = model.snapshot();
            match entity {
                DragEntity::Task(id) => snapshot.task(id).map(|t| DragOrigin::Column(t.column_id)),
                DragEntity::Column(id) => snapshot.column(id).map(|c| DragOrigin::Position(c.position)),
            }
        };

        match origin {
            Some(origin) => self.tracker.begin(entity, origin),
            None => {
                debug!(%entity, "drag ignored: entity not on the board");
                false
            }
        }
    }

    /// Pointer-move with the latest hit-test result. Updates the target and
    /// the "would land here" column.
    pub fn on_drag_over(&mut self, hit: Option<HitTarget>) {
        if !self.tracker.update_target(hit) {
            return;
        }
        let Some(entity) = self.tracker.session().map(|s| s.entity) else {
            return;
        };
        let resolution = match self.board.lock().as_ref() {
            Some(model) => resolve(entity, hit, model.snapshot()),
            None => Resolution::Noop,
        };
        self.tracker.set_indicator(resolution.target_column_id());
    }

    /// Pointer-up. Applies the drop optimistically and returns the job that
    /// persists it, or `None` when nothing changed.
    pub fn on_drag_end(&mut self) -> Option<ReconcileJob> {
        let finished = self.tracker.end()?;
        self.commit(|snapshot| resolve(finished.entity, finished.target, snapshot))
    }

    /// Move a column one slot up or down, as the column settings list does.
    /// The neighbours swap and every column is persisted, exactly like a
    /// dragged reorder. `None` at either end of the board.
    pub fn move_column_step(&mut self, column: ColumnId, direction: Direction) -> Option<ReconcileJob> {
        self.commit(|snapshot| resolve_step(column, direction, snapshot))
    }

    /// Resolve against the live snapshot, apply the result optimistically
    /// and build its job.
    fn commit<F>(&mut self, decide: F) -> Option<ReconcileJob>
    where
        F: FnOnce(&BoardSnapshot) -> Resolution,
    {
        let (project_id, epoch, resolution, optimistic) = {
            let mut slot = self.board.lock();
            let model = slot.as_mut()?;
            let resolution = decide(model.snapshot());
            if resolution.is_noop() {
                debug!(project = %model.project_id(), "change resolved to no-op");
                return None;
            }
            let optimistic = mutator::apply(model.snapshot(), &resolution);
            model.apply(optimistic.clone());
            (model.project_id(), model.epoch(), resolution, optimistic)
        };

        debug!(
            project = %project_id,
            ?resolution,
            snapshot = %Pretty(&optimistic),
            "change applied optimistically"
        );
        self.reconciler.job(project_id, epoch, resolution, &optimistic)
    }

    /// Abandon the gesture. No mutation, no network call.
    pub fn on_drag_cancel(&mut self) {
        self.tracker.cancel();
    }

    /// Open the task-editing overlay. Any drag in progress is cancelled and
    /// drag input stays suppressed until the token is dropped.
    #[must_use = "the overlay closes as soon as the token is dropped"]
    pub fn open_edit_overlay(&mut self) -> OverlayToken {
        let token = self.guard.open();
        self.tracker.cancel();
        token
    }

    /// Handle for whatever opens the overlay outside the controller
    pub fn guard(&self) -> OverlayGuard {
        self.guard.clone()
    }

    /// Whether a raw board input event must be swallowed
    pub fn should_intercept(&self, kind: InputKind) -> bool {
        self.guard.should_intercept(kind)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.board.project_id()
    }

    pub fn epoch(&self) -> Option<u64> {
        self.board.epoch()
    }

    /// Copy of the current board, if one is loaded
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.board.snapshot()
    }

    /// Tasks the view should render under `filter`
    pub fn visible_tasks(&self, filter: &BoardFilter) -> Vec<Task> {
        self.board
            .lock()
            .as_ref()
            .map(|model| {
                filter
                    .visible_tasks(model.snapshot())
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tracker(&self) -> &DragTracker {
        &self.tracker
    }

    pub fn is_dragging(&self, entity: DragEntity) -> bool {
        self.tracker.is_dragging(entity)
    }

    pub fn is_target(&self, target: HitTarget) -> bool {
        self.tracker.is_target(target)
    }

    pub fn is_highlighted(&self, column: ColumnId) -> bool {
        self.tracker.is_highlighted(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBoardApi;
    use crate::types::{Column, TaskId, User};

    fn api() -> Arc<InMemoryBoardApi> {
        Arc::new(InMemoryBoardApi::new().with_project(
            1,
            vec![Column::new(5, "Todo", 0), Column::new(7, "Done", 1)],
            vec![Task::new(20, "Write tests", 5).with_assignee(3)],
            vec![User::new(3, "Ada", "Lovelace")],
        ))
    }

    async fn loaded() -> BoardController {
        let mut controller = BoardController::new(api(), BoardConfig::default()).unwrap();
        controller.load_project(1).await.unwrap();
        controller
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BoardConfig {
            event_capacity: 0,
            ..BoardConfig::default()
        };
        assert!(BoardController::new(api(), config).is_err());
    }

    #[tokio::test]
    async fn test_load_project() {
        let controller = loaded().await;
        assert_eq!(controller.project_id(), Some(ProjectId::new(1)));
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.columns.len(), 2);
        assert_eq!(
            snapshot.tasks[0].assignee_name.as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[tokio::test]
    async fn test_drag_without_board_is_ignored() {
        let mut controller = BoardController::new(api(), BoardConfig::default()).unwrap();
        assert!(!controller.on_drag_start(DragEntity::Task(TaskId::new(20))));
        assert!(controller.on_drag_end().is_none());
    }

    #[tokio::test]
    async fn test_unknown_entity_does_not_open_session() {
        let mut controller = loaded().await;
        assert!(!controller.on_drag_start(DragEntity::Task(TaskId::new(99))));
        assert!(!controller.tracker().is_open());
    }

    #[tokio::test]
    async fn test_indicator_follows_resolution() {
        let mut controller = loaded().await;
        assert!(controller.on_drag_start(DragEntity::Task(TaskId::new(20))));

        controller.on_drag_over(Some(HitTarget::Column(ColumnId::new(7))));
        assert!(controller.is_highlighted(ColumnId::new(7)));
        assert!(controller.is_target(HitTarget::Column(ColumnId::new(7))));

        // Back over its own column: nothing would change, so no highlight
        controller.on_drag_over(Some(HitTarget::Column(ColumnId::new(5))));
        assert!(!controller.is_highlighted(ColumnId::new(5)));
        assert!(!controller.is_highlighted(ColumnId::new(7)));
    }

    #[tokio::test]
    async fn test_overlay_cancels_session() {
        let mut controller = loaded().await;
        controller.on_drag_start(DragEntity::Task(TaskId::new(20)));
        let token = controller.open_edit_overlay();

        assert!(!controller.tracker().is_open());
        assert!(controller.should_intercept(InputKind::PointerDown));
        drop(token);
        assert!(!controller.should_intercept(InputKind::PointerDown));
    }

    #[tokio::test]
    async fn test_unload_clears_board() {
        let mut controller = loaded().await;
        controller.unload();
        assert!(controller.snapshot().is_none());
        assert!(matches!(
            controller.refresh().await,
            Err(BoardError::NoProjectLoaded)
        ));
    }

    #[tokio::test]
    async fn test_reload_advances_epoch() {
        let mut controller = loaded().await;
        let first = controller.epoch().unwrap();
        controller.load_project(1).await.unwrap();
        assert!(controller.epoch().unwrap() > first);
    }
}
