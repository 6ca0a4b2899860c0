//! Board notifications for the host.
//!
//! The host subscribes and turns these into transient notices; nothing in
//! the engine waits on a subscriber.

use crate::resolver::Resolution;
use crate::types::ProjectId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BoardEvent {
    /// A project was fetched and installed
    Loaded {
        project_id: ProjectId,
        columns: usize,
        tasks: usize,
    },
    /// The server accepted a drop and its canonical records were merged
    Confirmed {
        project_id: ProjectId,
        resolution: Resolution,
    },
    /// The server accepted a drop, but a resync landed first and the merge
    /// was dropped
    Superseded {
        project_id: ProjectId,
        resolution: Resolution,
    },
    /// A drop could not be persisted; sent after the corrective resync ran
    ReconcileFailed {
        project_id: ProjectId,
        resolution: Resolution,
        message: String,
    },
    /// The model was replaced with server truth
    Resynced { project_id: ProjectId, epoch: u64 },
    /// Every resync attempt failed; the previous model was kept
    ResyncFailed { project_id: ProjectId, message: String },
}

impl BoardEvent {
    pub fn project_id(&self) -> ProjectId {
        match self {
            BoardEvent::Loaded { project_id, .. }
            | BoardEvent::Confirmed { project_id, .. }
            | BoardEvent::Superseded { project_id, .. }
            | BoardEvent::ReconcileFailed { project_id, .. }
            | BoardEvent::Resynced { project_id, .. }
            | BoardEvent::ResyncFailed { project_id, .. } => *project_id,
        }
    }

    /// Whether the host should surface this as an error notice
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            BoardEvent::ReconcileFailed { .. } | BoardEvent::ResyncFailed { .. }
        )
    }
}

/// Broadcast sender shared by the controller and reconciler
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: BoardEvent) {
        // An error only means nobody is listening
        if let Err(unsent) = self.tx.send(event) {
            trace!(event = ?unsent.0, "board event dropped, no subscribers");
        }
    }
}
