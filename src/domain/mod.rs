pub mod board;
pub mod item;
pub mod ordering;
pub mod state;

pub use board::{BoardConfig, Column};
pub use item::{ColumnId, GroupBy, Item, ItemId, OrderField};
pub use ordering::{OrderAssigner, Placement, Position};
pub use state::{BoardState, MoveUndo, RespacedOrder};
