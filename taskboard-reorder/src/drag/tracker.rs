//! Drag session tracker: at most one session, never while an overlay is open.

use super::session::{DragEntity, DragOrigin, DragSession, FinishedDrag, HitTarget};
use crate::guard::OverlayGuard;
use crate::types::ColumnId;
use tracing::debug;

#[derive(Debug, Default)]
pub struct DragTracker {
    session: Option<DragSession>,
    guard: OverlayGuard,
}

impl DragTracker {
    pub fn new(guard: OverlayGuard) -> Self {
        Self {
            session: None,
            guard,
        }
    }

    /// Open a session. Returns `false` (and changes nothing) when a session is
    /// already open or the overlay guard is active.
    pub fn begin(&mut self, entity: DragEntity, origin: DragOrigin) -> bool {
        if self.guard.is_active() {
            debug!(%entity, "drag ignored: edit overlay open");
            return false;
        }
        if let Some(open) = &self.session {
            debug!(%entity, active = %open.entity, "drag ignored: session already open");
            return false;
        }
        debug!(%entity, ?origin, "drag session opened");
        self.session = Some(DragSession::new(entity, origin));
        true
    }

    /// Record the latest hit-test result. Returns `false` if there is no
    /// session to update, including when the guard cancelled it.
    pub fn update_target(&mut self, target: Option<HitTarget>) -> bool {
        if self.cancel_if_suppressed() {
            return false;
        }
        match self.session.as_mut() {
            Some(session) => {
                session.target = target;
                true
            }
            None => false,
        }
    }

    /// Record the "would land here" column. Returns `false` if there is no
    /// session, including when the guard cancelled it.
    pub fn set_indicator(&mut self, column: Option<ColumnId>) -> bool {
        if self.cancel_if_suppressed() {
            return false;
        }
        match self.session.as_mut() {
            Some(session) => {
                session.indicator = column;
                true
            }
            None => false,
        }
    }

    /// Close the session and hand back the drop. `None` when no session was
    /// open or the overlay guard became active mid-gesture.
    pub fn end(&mut self) -> Option<FinishedDrag> {
        if self.cancel_if_suppressed() {
            return None;
        }
        let session = self.session.take()?;
        debug!(entity = %session.entity, target = ?session.target, "drag session closed");
        Some(FinishedDrag {
            entity: session.entity,
            origin: session.origin,
            target: session.target,
        })
    }

    /// Discard the open session without producing a drop
    pub fn cancel(&mut self) -> Option<DragSession> {
        let session = self.session.take();
        if let Some(s) = &session {
            debug!(entity = %s.entity, "drag session cancelled");
        }
        session
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Rendering predicate: is `entity` the one being dragged
    pub fn is_dragging(&self, entity: DragEntity) -> bool {
        self.session.as_ref().is_some_and(|s| s.entity == entity)
    }

    /// Rendering predicate: is the pointer currently over `target`
    pub fn is_target(&self, target: HitTarget) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.target == Some(target))
    }

    /// Rendering predicate: should `column` show the drop highlight
    pub fn is_highlighted(&self, column: ColumnId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.indicator == Some(column))
    }

    fn cancel_if_suppressed(&mut self) -> bool {
        if self.guard.is_active() && self.session.is_some() {
            debug!("edit overlay opened mid-drag");
            self.cancel();
            return true;
        }
        false
    }
}
