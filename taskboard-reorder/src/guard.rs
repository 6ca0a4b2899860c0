//! Modal suppression guard.
//!
//! The task board and the task-editing overlay share one pointer-event
//! surface. While an overlay is open the guard is active: no drag session may
//! start, a session already in progress is cancelled, and every board input
//! event is swallowed before it reaches the drag layer.
//!
//! The controller owns the guard and hands clones to whatever opens the
//! overlay. Opening returns an [`OverlayToken`]; the guard is released when
//! the token is dropped, whichever way the overlay closed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Raw input event kinds the board receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    PointerDown,
    PointerMove,
    PointerUp,
    MouseDown,
    MouseMove,
    MouseUp,
    TouchStart,
    TouchMove,
    TouchEnd,
    DragStart,
    DragOver,
    DragEnd,
}

impl InputKind {
    pub const ALL: [InputKind; 12] = [
        InputKind::PointerDown,
        InputKind::PointerMove,
        InputKind::PointerUp,
        InputKind::MouseDown,
        InputKind::MouseMove,
        InputKind::MouseUp,
        InputKind::TouchStart,
        InputKind::TouchMove,
        InputKind::TouchEnd,
        InputKind::DragStart,
        InputKind::DragOver,
        InputKind::DragEnd,
    ];
}

/// Shared handle to the overlay-open state.
#[derive(Debug, Clone, Default)]
pub struct OverlayGuard {
    open_overlays: Arc<AtomicUsize>,
}

impl OverlayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an editing overlay as open until the returned token is dropped.
    #[must_use = "the guard is released as soon as the token is dropped"]
    pub fn open(&self) -> OverlayToken {
        let previous = self.open_overlays.fetch_add(1, Ordering::SeqCst);
        debug!(open = previous + 1, "edit overlay opened, drag input suppressed");
        OverlayToken {
            guard: self.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.open_overlays.load(Ordering::SeqCst) > 0
    }

    /// Whether a board input event must be stopped before the drag layer
    pub fn should_intercept(&self, _kind: InputKind) -> bool {
        self.is_active()
    }

    fn release(&self) {
        let _ = self
            .open_overlays
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if !self.is_active() {
            debug!("edit overlay closed, drag input restored");
        }
    }
}

/// Proof that an editing overlay is open. Dropping it closes the overlay
/// from the guard's point of view.
#[derive(Debug)]
pub struct OverlayToken {
    guard: OverlayGuard,
}

impl OverlayToken {
    /// Explicitly close the overlay; equivalent to dropping the token.
    pub fn close(self) {}
}

impl Drop for OverlayToken {
    fn drop(&mut self) {
        self.guard.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_inactive_by_default() {
        let guard = OverlayGuard::new();
        assert!(!guard.is_active());
        assert!(InputKind::ALL.iter().all(|k| !guard.should_intercept(*k)));
    }

    #[test]
    fn test_token_holds_guard_until_dropped() {
        let guard = OverlayGuard::new();
        let token = guard.open();
        assert!(guard.is_active());
        assert!(InputKind::ALL.iter().all(|k| guard.should_intercept(*k)));

        token.close();
        assert!(!guard.is_active());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = OverlayGuard::new();
        let overlay_side = guard.clone();
        let _token = overlay_side.open();
        assert!(guard.is_active());
    }

    #[test]
    fn test_released_when_overlay_panics() {
        let guard = OverlayGuard::new();
        let overlay_side = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _token = overlay_side.open();
            panic!("save handler failed");
        });
        assert!(result.is_err());
        assert!(!guard.is_active());
    }

    #[test]
    fn test_nested_overlays() {
        let guard = OverlayGuard::new();
        let outer = guard.open();
        let inner = guard.open();
        drop(inner);
        assert!(guard.is_active());
        drop(outer);
        assert!(!guard.is_active());
    }
}
