//! Reconciliation: persist an optimistic change, then confirm or resync.
//!
//! A drop produces a [`ReconcileJob`]. Running it issues the remote writes
//! and settles the local model one of two ways:
//!
//! - **Success**: each canonical record returned by the server is merged back
//!   by id. If a resync landed since the job was created (the model's epoch
//!   moved on) the merge is dropped.
//! - **Failure**: the optimistic state is discarded by refetching the whole
//!   board and replacing the model. A failure notice is emitted only after
//!   that resync has been attempted.
//!
//! A column batch that fails part way leaves the server with gapped or
//! duplicate positions. The resync notices, renumbers the server's current
//! order `0..N` with one more batch and refetches; only a consistent board
//! is ever installed.
//!
//! The model lock is only ever taken for synchronous reads and writes.

use crate::api::BoardApi;
use crate::config::BoardConfig;
use crate::error::{BoardError, Result};
use crate::events::{BoardEvent, EventBus};
use crate::model::{BoardSnapshot, SharedBoard};
use crate::mutator;
use crate::resolver::Resolution;
use crate::types::{Column, ColumnId, ColumnUpdate, ProjectId, Task, TaskId, TaskUpdate};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use taskboard_common::{with_timeout, CategorizedError, Pretty, RetryManager};
use tracing::{debug, info, warn};

/// How a reconciliation job ended
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The server accepted the change and it was merged
    Confirmed,
    /// The server accepted the change but the merge was dropped: a resync
    /// landed first, or the project was unloaded
    Superseded,
    /// The change failed and the board was resynced from the server
    Resynced { cause: BoardError },
    /// The change failed and so did every resync attempt; the model still
    /// holds the optimistic state
    ResyncFailed {
        cause: BoardError,
        resync_error: BoardError,
    },
}

impl ReconcileOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ReconcileOutcome::Confirmed)
    }

    /// The error that sent the job down the resync path, if any
    pub fn cause(&self) -> Option<&BoardError> {
        match self {
            ReconcileOutcome::Resynced { cause } | ReconcileOutcome::ResyncFailed { cause, .. } => {
                Some(cause)
            }
            _ => None,
        }
    }
}

/// Canonical records returned by a successful write
enum Canonical {
    Columns(Vec<Column>),
    Task(Task),
}

/// Remote writes a job has to make
#[derive(Debug, Clone)]
enum Persist {
    /// Every column of the board, at its optimistic position
    Columns(Vec<Column>),
    Task { task: TaskId, to: ColumnId },
}

/// Talks to the [`BoardApi`] on behalf of the controller and settles the
/// shared model.
pub struct Reconciler {
    api: Arc<dyn BoardApi>,
    board: SharedBoard,
    events: EventBus,
    config: BoardConfig,
    retry: RetryManager,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("board", &self.board)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn BoardApi>,
        board: SharedBoard,
        events: EventBus,
        config: BoardConfig,
    ) -> Self {
        let retry = RetryManager::with_config(config.resync.clone());
        Self {
            api,
            board,
            events,
            config,
            retry,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Fetch `(columns, tasks, users)` for a project concurrently, retrying
    /// the whole triple with backoff. Columns come back sorted by position
    /// and tasks carry their derived assignee names.
    pub async fn fetch(&self, project_id: ProjectId) -> Result<BoardSnapshot> {
        self.retry
            .retry("board fetch", || self.fetch_once(project_id))
            .await
    }

    /// Fetch the board and check both invariants before handing it out.
    ///
    /// Column positions that are not dense are repaired on the server: the
    /// fetched order is renumbered `0..N`, written back as one all-or-nothing
    /// batch and the board is fetched again. A board that still fails the
    /// check is an error.
    pub async fn fetch_consistent(&self, project_id: ProjectId) -> Result<BoardSnapshot> {
        let snapshot = self.fetch(project_id).await?;
        if snapshot.has_dense_positions() {
            snapshot.check_invariants()?;
            return Ok(snapshot);
        }

        let mut columns = snapshot.columns;
        let found: Vec<usize> = columns.iter().map(|c| c.position).collect();
        warn!(project = %project_id, positions = ?found, "server column positions not dense, renumbering");
        mutator::renumber(&mut columns);
        self.persist_columns(project_id, &columns).await?;

        let repaired = self.fetch(project_id).await?;
        repaired.check_invariants()?;
        info!(project = %project_id, columns = repaired.columns.len(), "column positions repaired");
        Ok(repaired)
    }

    /// Replace the model with server truth for `project_id`.
    ///
    /// Returns the new epoch, or `None` when another project was loaded (or
    /// the board unloaded) while the fetch was in flight; the fetched data
    /// is then dropped. On failure, including a board whose positions could
    /// not be repaired, the current model is kept and a
    /// [`BoardEvent::ResyncFailed`] is emitted.
    pub async fn resync(&self, project_id: ProjectId) -> Result<Option<u64>> {
        let snapshot = match self.fetch_consistent(project_id).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(project = %project_id, %error, "board resync failed, keeping stale model");
                self.events.emit(BoardEvent::ResyncFailed {
                    project_id,
                    message: error.user_friendly_message(),
                });
                return Err(error);
            }
        };

        let epoch = {
            let mut slot = self.board.lock();
            match slot.as_mut() {
                Some(model) if model.project_id() == project_id => {
                    model.resync(snapshot);
                    Some(model.epoch())
                }
                _ => None,
            }
        };

        match epoch {
            Some(epoch) => {
                info!(project = %project_id, epoch, "board resynced");
                self.events.emit(BoardEvent::Resynced { project_id, epoch });
            }
            None => debug!(project = %project_id, "resync result dropped, project no longer loaded"),
        }
        Ok(epoch)
    }

    /// Build the job that persists `resolution`. `optimistic` is the snapshot
    /// the mutator produced for it, and `epoch` the model epoch it was
    /// installed in.
    pub(crate) fn job(
        self: &Arc<Self>,
        project_id: ProjectId,
        epoch: u64,
        resolution: Resolution,
        optimistic: &BoardSnapshot,
    ) -> Option<ReconcileJob> {
        let persist = match resolution {
            Resolution::Noop => return None,
            Resolution::ReorderColumn { .. } => Persist::Columns(optimistic.columns.clone()),
            Resolution::MoveTask { task, to, .. } => Persist::Task { task, to },
        };
        Some(ReconcileJob {
            reconciler: Arc::clone(self),
            project_id,
            epoch,
            resolution,
            persist,
        })
    }

    async fn fetch_once(&self, project_id: ProjectId) -> Result<BoardSnapshot> {
        let (columns, tasks, users) = tokio::try_join!(
            self.timed("get_columns", self.api.get_columns(project_id)),
            self.timed("get_tasks", self.api.get_tasks(project_id)),
            self.timed("get_project_users", self.api.get_project_users(project_id)),
        )?;
        Ok(BoardSnapshot::from_parts(columns, tasks, users))
    }

    async fn timed<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_timeout(call, self.config.request_timeout)
            .await
            .map_err(|e| BoardError::from_timeout(operation, e))
    }

    /// Persist every column concurrently. All-or-nothing: one failed call
    /// fails the batch.
    async fn persist_columns(&self, project_id: ProjectId, columns: &[Column]) -> Result<Vec<Column>> {
        let calls = columns.iter().map(|column| {
            self.timed(
                "update_column",
                self.api
                    .update_column(project_id, column.id, ColumnUpdate::from(column)),
            )
        });
        let results = join_all(calls).await;

        let total = results.len();
        let mut canonical = Vec::with_capacity(total);
        let mut failed = 0;
        let mut first = None;
        for result in results {
            match result {
                Ok(column) => canonical.push(column),
                Err(error) => {
                    failed += 1;
                    first.get_or_insert(error);
                }
            }
        }

        match first {
            Some(first) => Err(BoardError::BatchFailed {
                failed,
                total,
                first: Box::new(first),
            }),
            None => Ok(canonical),
        }
    }

    async fn persist(&self, project_id: ProjectId, persist: &Persist) -> Result<Canonical> {
        match persist {
            Persist::Columns(columns) => self
                .persist_columns(project_id, columns)
                .await
                .map(Canonical::Columns),
            Persist::Task { task, to } => self
                .timed(
                    "update_task",
                    self.api
                        .update_task(project_id, *task, TaskUpdate { column_id: *to }),
                )
                .await
                .map(Canonical::Task),
        }
    }

    /// Merge canonical records if the model is still the one the job was
    /// created against. `Ok(false)` means the merge was superseded.
    fn merge(&self, project_id: ProjectId, epoch: u64, canonical: Canonical) -> Result<bool> {
        let mut slot = self.board.lock();
        let Some(model) = slot.as_mut() else {
            return Ok(false);
        };
        if model.project_id() != project_id || model.epoch() != epoch {
            return Ok(false);
        }

        match canonical {
            Canonical::Columns(columns) => model.merge_columns(&columns)?,
            Canonical::Task(task) => model.merge_task(task)?,
        }
        model.snapshot().check_invariants()?;
        debug!(project = %project_id, snapshot = %Pretty(model.snapshot()), "canonical records merged");
        Ok(true)
    }

    async fn run(&self, job: &ReconcileJob) -> ReconcileOutcome {
        let ReconcileJob {
            project_id,
            epoch,
            resolution,
            ..
        } = *job;

        let cause = match self.persist(project_id, &job.persist).await {
            Ok(canonical) => match self.merge(project_id, epoch, canonical) {
                Ok(true) => {
                    debug!(project = %project_id, ?resolution, "drop confirmed");
                    self.events.emit(BoardEvent::Confirmed {
                        project_id,
                        resolution,
                    });
                    return ReconcileOutcome::Confirmed;
                }
                Ok(false) => {
                    debug!(project = %project_id, ?resolution, "merge superseded by resync");
                    self.events.emit(BoardEvent::Superseded {
                        project_id,
                        resolution,
                    });
                    return ReconcileOutcome::Superseded;
                }
                Err(error) => {
                    warn!(project = %project_id, %error, "merged model is inconsistent");
                    error
                }
            },
            Err(error) => {
                warn!(project = %project_id, ?resolution, %error, "reconciliation failed");
                error
            }
        };

        let outcome = match self.resync(project_id).await {
            Ok(_) => ReconcileOutcome::Resynced { cause },
            Err(resync_error) => ReconcileOutcome::ResyncFailed {
                cause,
                resync_error,
            },
        };

        if let Some(cause) = outcome.cause() {
            self.events.emit(BoardEvent::ReconcileFailed {
                project_id,
                resolution,
                message: cause.user_friendly_message(),
            });
        }
        outcome
    }
}

/// Pending remote persistence for one drop.
///
/// The gesture path stays synchronous; the host spawns [`ReconcileJob::run`]
/// on whatever executor it has. Dropping the job without running it leaves
/// the optimistic state in place until the next resync.
#[must_use = "the drop is only persisted when the job is run"]
#[derive(Debug)]
pub struct ReconcileJob {
    reconciler: Arc<Reconciler>,
    project_id: ProjectId,
    epoch: u64,
    resolution: Resolution,
    persist: Persist,
}

impl ReconcileJob {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Model epoch the optimistic change was applied in
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Issue the remote writes and settle the model
    pub async fn run(self) -> ReconcileOutcome {
        let reconciler = Arc::clone(&self.reconciler);
        reconciler.run(&self).await
    }
}
