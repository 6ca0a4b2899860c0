//! Drag gesture state

mod session;
mod tracker;

pub use session::{DragEntity, DragOrigin, DragSession, FinishedDrag, HitTarget};
pub use tracker::DragTracker;
