//! Drag and drop: geometry, drop target resolution, keyboard navigation
//! and the drag lifecycle.

pub mod collision;
pub mod controller;
pub mod geometry;
pub mod keyboard;

pub use collision::{resolve, DropTarget, Droppable};
pub use controller::{Commit, DragController, DragPhase, DragSession, DropOutcome, Sensor};
pub use geometry::{Point, Rect};
pub use keyboard::{next_target, Direction};
