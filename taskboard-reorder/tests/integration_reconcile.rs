//! Integration tests for reconciliation: merge, resync and supersession

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use taskboard_common::RetryConfig;
use taskboard_reorder::{
    ApiOperation, BoardApi, BoardConfig, BoardController, BoardError, BoardEvent, BoardSnapshot,
    Column, ColumnId, ColumnUpdate, DragEntity, HitTarget, InMemoryBoardApi, ProjectId,
    ReconcileOutcome, Result, Task, TaskId, TaskUpdate, User,
};
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

const PROJECT: i64 = 1;

fn seeded() -> InMemoryBoardApi {
    InMemoryBoardApi::new().with_project(
        PROJECT,
        vec![
            Column::new(10, "A", 0),
            Column::new(11, "B", 1),
            Column::new(12, "C", 2),
            Column::new(13, "D", 3),
        ],
        vec![
            Task::new(1, "T", 10).with_assignee(9),
            Task::new(2, "U", 12),
        ],
        vec![User::new(9, "Linus", "Torvalds")],
    )
}

fn fast_retry() -> BoardConfig {
    BoardConfig::default()
        .with_request_timeout(Duration::from_secs(2))
        .with_resync(RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            use_jitter: false,
            ..RetryConfig::default()
        })
}

async fn controller_for(api: Arc<dyn BoardApi>) -> BoardController {
    let mut controller = BoardController::new(api, fast_retry()).unwrap();
    controller.load_project(PROJECT).await.unwrap();
    controller
}

/// What a fresh load of the server would produce
fn server_truth(api: &InMemoryBoardApi) -> BoardSnapshot {
    let server = api.project(PROJECT).unwrap();
    let tasks = server
        .tasks
        .into_iter()
        .map(|mut t| {
            t.assignee_name = None;
            t
        })
        .collect();
    BoardSnapshot::from_parts(server.columns, tasks, server.users)
}

fn move_task(controller: &mut BoardController, task: i64, column: i64) {
    assert!(controller.on_drag_start(DragEntity::Task(TaskId::new(task))));
    controller.on_drag_over(Some(HitTarget::Column(ColumnId::new(column))));
}

fn move_column(controller: &mut BoardController, column: i64, target: i64) {
    assert!(controller.on_drag_start(DragEntity::Column(ColumnId::new(column))));
    controller.on_drag_over(Some(HitTarget::Column(ColumnId::new(target))));
}

fn drain(rx: &mut broadcast::Receiver<BoardEvent>) -> Vec<BoardEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test_log::test(tokio::test)]
async fn test_failed_task_move_resyncs_to_server_truth() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();

    // Someone else renames a column while we drag
    api.edit_project(PROJECT, |p| p.columns[1].name = "Blocked".into())
        .unwrap();
    api.reject_next(ApiOperation::UpdateTask, 500);

    move_task(&mut controller, 1, 13);
    let job = controller.on_drag_end().unwrap();
    assert_eq!(
        controller.snapshot().unwrap().task(TaskId::new(1)).unwrap().column_id,
        ColumnId::new(13)
    );

    let outcome = job.run().await;
    assert!(matches!(
        outcome,
        ReconcileOutcome::Resynced {
            cause: BoardError::Rejected { status: 500, .. }
        }
    ));

    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot, server_truth(&api));
    assert_eq!(snapshot.task(TaskId::new(1)).unwrap().column_id, ColumnId::new(10));
    assert_eq!(snapshot.columns[1].name, "Blocked");
    assert_eq!(
        snapshot.task(TaskId::new(1)).unwrap().assignee_name.as_deref(),
        Some("Linus Torvalds")
    );

    // The notice comes after the corrective resync
    let events = drain(&mut rx);
    assert!(matches!(events[0], BoardEvent::Resynced { .. }));
    assert!(matches!(events[1], BoardEvent::ReconcileFailed { .. }));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_partial_column_batch_fails_whole_batch() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    api.clear_calls();
    api.fail_next(ApiOperation::UpdateColumn);

    move_column(&mut controller, 13, 11);
    let outcome = controller.on_drag_end().unwrap().run().await;

    match outcome.cause() {
        Some(BoardError::BatchFailed { failed, total, .. }) => {
            assert_eq!(*failed, 1);
            assert_eq!(*total, 4);
        }
        other => panic!("expected a batch failure, got {:?}", other),
    }
    assert!(matches!(outcome, ReconcileOutcome::Resynced { .. }));

    // Every call in the batch was issued, then the triple was refetched
    assert_eq!(api.call_count(ApiOperation::UpdateColumn), 4);
    assert_eq!(api.call_count(ApiOperation::GetColumns), 1);
    assert_eq!(api.call_count(ApiOperation::GetTasks), 1);
    assert_eq!(api.call_count(ApiOperation::GetProjectUsers), 1);

    let snapshot = controller.snapshot().unwrap();
    assert!(snapshot.has_dense_positions());
    assert_eq!(snapshot, server_truth(&api));
}

#[test_log::test(tokio::test)]
async fn test_partial_batch_leaving_gaps_is_renumbered() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();
    api.clear_calls();
    // The first write is B moving from 1 to 0; losing it leaves B and C both at 1
    api.fail_next(ApiOperation::UpdateColumn);

    move_column(&mut controller, 10, 13);
    let outcome = controller.on_drag_end().unwrap().run().await;

    assert!(matches!(
        outcome,
        ReconcileOutcome::Resynced {
            cause: BoardError::BatchFailed { failed: 1, total: 4, .. }
        }
    ));
    // Failed batch, then the renumbering batch; the board is fetched before and after it
    assert_eq!(api.call_count(ApiOperation::UpdateColumn), 8);
    assert_eq!(api.call_count(ApiOperation::GetColumns), 2);

    let snapshot = controller.snapshot().unwrap();
    assert!(snapshot.has_dense_positions());
    assert_ok!(snapshot.check_invariants());
    let names: Vec<_> = snapshot.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["B", "C", "D", "A"]);
    assert_eq!(snapshot, server_truth(&api));

    let events = drain(&mut rx);
    assert!(matches!(events[0], BoardEvent::Resynced { .. }));
    assert!(matches!(events[1], BoardEvent::ReconcileFailed { .. }));
}

#[tokio::test]
async fn test_failed_renumbering_reports_resync_failure() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();

    // Another client left a gap, and column writes are now refused
    api.edit_project(PROJECT, |p| p.columns[3].position = 7)
        .unwrap();
    api.fail_always(ApiOperation::UpdateColumn);

    move_column(&mut controller, 10, 13);
    let job = controller.on_drag_end().unwrap();
    let optimistic = controller.snapshot().unwrap();
    let outcome = job.run().await;

    assert!(matches!(
        outcome,
        ReconcileOutcome::ResyncFailed {
            resync_error: BoardError::BatchFailed { .. },
            ..
        }
    ));
    assert_eq!(controller.snapshot().unwrap(), optimistic);

    let events = drain(&mut rx);
    assert!(matches!(events[0], BoardEvent::ResyncFailed { .. }));
    assert!(matches!(events[1], BoardEvent::ReconcileFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_resync_retries_before_giving_up() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();
    api.clear_calls();

    api.fail_next(ApiOperation::UpdateTask);
    api.fail_times(ApiOperation::GetTasks, 2);

    move_task(&mut controller, 2, 11);
    let outcome = controller.on_drag_end().unwrap().run().await;

    assert!(matches!(outcome, ReconcileOutcome::Resynced { .. }));
    assert_eq!(api.call_count(ApiOperation::GetTasks), 3);
    assert_eq!(controller.snapshot().unwrap(), server_truth(&api));

    let events = drain(&mut rx);
    assert!(events.iter().all(|e| !matches!(e, BoardEvent::ResyncFailed { .. })));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_resync_failure_keeps_stale_model() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();
    api.clear_calls();

    api.reject_next(ApiOperation::UpdateTask, 503);
    api.fail_always(ApiOperation::GetColumns);

    move_task(&mut controller, 1, 12);
    let job = controller.on_drag_end().unwrap();
    let optimistic = controller.snapshot().unwrap();
    let outcome = job.run().await;

    assert!(matches!(
        outcome,
        ReconcileOutcome::ResyncFailed {
            resync_error: BoardError::Transport { .. },
            ..
        }
    ));
    // 1 + max_retries attempts
    assert_eq!(api.call_count(ApiOperation::GetColumns), 3);
    assert_eq!(controller.snapshot().unwrap(), optimistic);

    let events = drain(&mut rx);
    assert!(matches!(events[0], BoardEvent::ResyncFailed { .. }));
    assert!(matches!(events[1], BoardEvent::ReconcileFailed { .. }));
    assert!(events.iter().all(|e| e.is_failure()));

    // Once the server is reachable again a manual refresh recovers
    api.clear_failures();
    assert_ok!(controller.refresh().await);
    assert_eq!(controller.snapshot().unwrap(), server_truth(&api));
}

#[tokio::test]
async fn test_rejected_move_reports_status() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    api.clear_calls();
    api.reject_next(ApiOperation::UpdateTask, 404);

    move_task(&mut controller, 2, 10);
    let outcome = controller.on_drag_end().unwrap().run().await;

    assert!(matches!(
        outcome.cause(),
        Some(BoardError::Rejected { status: 404, .. })
    ));
    assert_eq!(api.call_count(ApiOperation::UpdateTask), 1);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_success_after_resync_is_discarded() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;
    let mut rx = controller.subscribe();
    let epoch_before = controller.epoch().unwrap();

    // A slow task move and a column reorder that fails fast
    api.set_latency(ApiOperation::UpdateTask, Duration::from_millis(500));
    api.fail_next(ApiOperation::UpdateColumn);

    move_task(&mut controller, 1, 11);
    let slow = controller.on_drag_end().unwrap();
    move_column(&mut controller, 10, 13);
    let failing = controller.on_drag_end().unwrap();
    assert_eq!(slow.epoch(), failing.epoch());

    let (slow_outcome, failing_outcome) = tokio::join!(slow.run(), failing.run());

    assert!(matches!(failing_outcome, ReconcileOutcome::Resynced { .. }));
    assert!(matches!(slow_outcome, ReconcileOutcome::Superseded));
    assert!(controller.epoch().unwrap() > epoch_before);

    // The model is what the resync fetched; the late merge never landed
    let snapshot = controller.snapshot().unwrap();
    assert_eq!(snapshot.task(TaskId::new(1)).unwrap().column_id, ColumnId::new(10));
    assert!(snapshot.check_invariants().is_ok());

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, BoardEvent::Superseded { .. })));
}

#[tokio::test]
async fn test_concurrent_jobs_merge_their_own_entities() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;

    move_task(&mut controller, 1, 12);
    let first = controller.on_drag_end().unwrap();
    move_column(&mut controller, 13, 10);
    let second = controller.on_drag_end().unwrap();

    // Complete out of order
    assert!(second.run().await.is_confirmed());
    assert!(first.run().await.is_confirmed());

    let snapshot = controller.snapshot().unwrap();
    let names: Vec<_> = snapshot.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["D", "A", "B", "C"]);
    assert_eq!(snapshot.task(TaskId::new(1)).unwrap().column_id, ColumnId::new(12));
    assert_eq!(snapshot, server_truth(&api));
}

#[tokio::test]
async fn test_job_for_unloaded_project_is_superseded() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;

    move_task(&mut controller, 1, 13);
    let job = controller.on_drag_end().unwrap();
    controller.unload();

    assert!(matches!(job.run().await, ReconcileOutcome::Superseded));
    assert!(controller.snapshot().is_none());
}

/// Server that acknowledges column writes with positions shifted by one,
/// as a misbehaving backend would
struct SkewedPositions(InMemoryBoardApi);

#[async_trait]
impl BoardApi for SkewedPositions {
    async fn update_column(
        &self,
        project_id: ProjectId,
        column_id: ColumnId,
        update: ColumnUpdate,
    ) -> Result<Column> {
        let mut column = self.0.update_column(project_id, column_id, update).await?;
        column.position += 1;
        Ok(column)
    }

    async fn update_task(
        &self,
        project_id: ProjectId,
        task_id: TaskId,
        update: TaskUpdate,
    ) -> Result<Task> {
        self.0.update_task(project_id, task_id, update).await
    }

    async fn get_columns(&self, project_id: ProjectId) -> Result<Vec<Column>> {
        self.0.get_columns(project_id).await
    }

    async fn get_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.0.get_tasks(project_id).await
    }

    async fn get_project_users(&self, project_id: ProjectId) -> Result<Vec<User>> {
        self.0.get_project_users(project_id).await
    }
}

#[test_log::test(tokio::test)]
async fn test_inconsistent_merge_forces_resync() {
    let api = Arc::new(SkewedPositions(seeded()));
    let mut controller = controller_for(api.clone()).await;

    move_column(&mut controller, 12, 10);
    let outcome = controller.on_drag_end().unwrap().run().await;

    assert!(matches!(
        outcome.cause(),
        Some(BoardError::InvariantViolation { .. })
    ));
    let snapshot = controller.snapshot().unwrap();
    assert!(snapshot.has_dense_positions());
    assert_eq!(snapshot, server_truth(&api.0));
}

#[tokio::test]
async fn test_load_failure_leaves_no_board() {
    let api = Arc::new(seeded());
    let mut controller = controller_for(api.clone()).await;

    let err = assert_err!(controller.load_project(42).await);
    assert!(matches!(err, BoardError::Rejected { status: 404, .. }));
    assert!(controller.project_id().is_none());
    assert!(controller.on_drag_end().is_none());
}
