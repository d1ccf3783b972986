//! Keyboard drag navigation.
//!
//! Arrow keys walk the drop target through the board instead of moving a
//! pointer: up and down step over the items of the current column, left and
//! right jump to the neighbouring column at the same slot.

use crate::dnd::collision::DropTarget;
use crate::domain::item::{ColumnId, ItemId};
use crate::domain::state::BoardState;

/// Navigation direction for a keyboard drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Target reached from `current` by one step in `direction`
///
/// Returns `None` when there is nowhere to go (top of a column, last
/// column, unresolvable target), in which case the drag keeps its target.
pub fn next_target(
    board: &BoardState,
    active: &ItemId,
    current: &DropTarget,
    direction: Direction,
) -> Option<DropTarget> {
    let column = board.find_container(current.as_str())?.clone();
    let items = board.items_in(&column);
    // A column target stands for the slot after the last item
    let slot = match current {
        DropTarget::Item(id) => board.index_of(&column, id)?,
        DropTarget::Column(_) => items.len(),
    };

    match direction {
        Direction::Up => {
            let above = slot.checked_sub(1)?;
            items.get(above).map(|item| DropTarget::Item(item.id.clone()))
        }
        Direction::Down => {
            if slot >= items.len() {
                None
            } else if slot + 1 < items.len() {
                Some(DropTarget::Item(items[slot + 1].id.clone()))
            } else {
                Some(DropTarget::Column(column))
            }
        }
        Direction::Left | Direction::Right => {
            let neighbour = adjacent_column(board, &column, direction)?;
            let others: Vec<&ItemId> = board
                .items_in(&neighbour)
                .iter()
                .map(|item| &item.id)
                .filter(|id| *id != active)
                .collect();
            match others.get(slot) {
                Some(id) => Some(DropTarget::Item((*id).clone())),
                None => Some(DropTarget::Column(neighbour)),
            }
        }
    }
}

fn adjacent_column(board: &BoardState, column: &ColumnId, direction: Direction) -> Option<ColumnId> {
    let columns = board.columns();
    let at = columns.iter().position(|id| id == column)?;
    let next = match direction {
        Direction::Left => at.checked_sub(1)?,
        Direction::Right => at + 1,
        Direction::Up | Direction::Down => return None,
    };
    columns.get(next).cloned()
}
