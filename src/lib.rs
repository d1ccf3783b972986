//! # Pipeline Board
//!
//! Drag-and-drop reordering engine for pipeline (kanban) boards.
//!
//! Items are grouped into columns and ordered by a floating-point order
//! value, highest first. Moves are applied to the board immediately and
//! written to an [`ItemStore`] in the background; a failed write puts the
//! item back where it was. Large columns are windowed so only the visible
//! items are rendered.

pub mod config;
pub mod dnd;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod sync;
pub mod view;

// Re-export commonly used types
pub use config::EngineConfig;
pub use dnd::{Direction, DragController, DragPhase, DropOutcome, DropTarget, Droppable, Point, Rect};
pub use domain::{
    BoardConfig, BoardState, Column, ColumnId, GroupBy, Item, ItemId, OrderAssigner, OrderField,
};
pub use error::{BoardError, Result};
pub use pipeline::{MoveSummary, Notification, PipelineBoard, Release};
pub use storage::{ItemPatch, ItemStore};
pub use sync::{CacheInvalidator, QueryCache, SyncReconciler};
pub use view::{column_views, ColumnView, ColumnVirtualizer, VirtualizerOptions};

#[cfg(feature = "file-storage")]
pub use storage::file_storage::FileStorage;
