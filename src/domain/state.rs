use crate::domain::board::Column;
use crate::domain::item::{ColumnId, GroupBy, Item, ItemId, OrderField};
use crate::error::{BoardError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Partition of the board's items into ordered per-column sequences
///
/// The sequence order is authoritative. Numeric order fields are derived
/// from it when an item is moved, and only for the moved item.
///
/// Column sequences are reference counted so that a move copies just the
/// columns it touches; every other column is shared with the previous
/// state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardState {
    columns: Vec<ColumnId>,
    buckets: HashMap<ColumnId, Arc<Vec<Item>>>,
}

/// What is needed to put a moved item back where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct MoveUndo {
    /// Snapshot of the item before the move
    pub original: Item,
    pub source_column: ColumnId,
    pub source_index: usize,
    /// Column the item was moved into
    pub applied_column: ColumnId,
    /// Order field the move wrote
    pub field: OrderField,
    /// Order the move gave the item
    pub applied_order: f64,
    /// Siblings renumbered by the move, in the order their writes are sent
    pub respaced: Vec<RespacedOrder>,
}

/// Order of a sibling before and after a column was respaced
#[derive(Debug, Clone, PartialEq)]
pub struct RespacedOrder {
    pub item_id: ItemId,
    pub previous: f64,
    pub applied: f64,
}

impl BoardState {
    /// Buckets `items` by `key_of` in one forward pass
    ///
    /// Every configured column gets an entry, empty if no item names it.
    /// Items without a key land in [`ColumnId::unassigned`]; items naming an
    /// unconfigured column keep a bucket of their own, so no item is lost.
    pub fn initialize<I, F>(items: I, columns: &[Column], key_of: F) -> Self
    where
        I: IntoIterator<Item = Item>,
        F: Fn(&Item) -> Option<ColumnId>,
    {
        let mut buckets: HashMap<ColumnId, Vec<Item>> = HashMap::with_capacity(columns.len());

        for item in items {
            let key = key_of(&item).unwrap_or_else(ColumnId::unassigned);
            buckets.entry(key).or_default().push(item);
        }

        let mut sorted: Vec<&Column> = columns.iter().collect();
        sorted.sort_by_key(|col| col.order);

        let mut seen = HashSet::with_capacity(sorted.len());
        let mut order = Vec::with_capacity(sorted.len());
        for column in sorted {
            if seen.insert(column.id.clone()) {
                buckets.entry(column.id.clone()).or_default();
                order.push(column.id.clone());
            }
        }

        Self {
            columns: order,
            buckets: buckets
                .into_iter()
                .map(|(key, items)| (key, Arc::new(items)))
                .collect(),
        }
    }

    /// Buckets `items` using a board grouping
    pub fn from_grouping<I>(items: I, columns: &[Column], group_by: &GroupBy) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        Self::initialize(items, columns, |item| group_by.key_of(item))
    }

    /// Configured columns in display order
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn has_column(&self, id: &ColumnId) -> bool {
        self.buckets.contains_key(id)
    }

    /// Sequence of a column, or an empty slice for an unknown column
    pub fn items_in(&self, id: &ColumnId) -> &[Item] {
        self.buckets
            .get(id)
            .map(|items| items.as_slice())
            .unwrap_or(&[])
    }

    /// Shared handle to a column's sequence
    pub fn column(&self, id: &ColumnId) -> Option<&Arc<Vec<Item>>> {
        self.buckets.get(id)
    }

    /// Resolves an item or column id to the column that holds it
    ///
    /// A column id resolves to itself; any other id is looked up among the
    /// items of every bucket.
    pub fn find_container(&self, id: &str) -> Option<&ColumnId> {
        if let Some((key, _)) = self.buckets.get_key_value(id) {
            return Some(key);
        }

        self.buckets
            .iter()
            .find(|(_, items)| items.iter().any(|item| item.id.as_str() == id))
            .map(|(key, _)| key)
    }

    pub fn index_of(&self, column: &ColumnId, id: &ItemId) -> Option<usize> {
        self.buckets
            .get(column)
            .and_then(|items| items.iter().position(|item| &item.id == id))
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.buckets
            .values()
            .find_map(|items| items.iter().find(|item| &item.id == id))
    }

    pub fn iter_items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.buckets.values().flat_map(|items| items.iter())
    }

    /// Total number of items across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(|items| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|items| items.is_empty())
    }

    /// Moves `active` from `source` to position `dest_index` of `dest`
    ///
    /// Returns `Ok(None)` when the move would leave the item where it is;
    /// nothing is allocated in that case. `dest_index` is the index the item
    /// ends up at, so for a reorder within one column it must be below the
    /// column length and for a cross-column move at most the destination
    /// length.
    pub fn apply_move(
        &self,
        source: &ColumnId,
        dest: &ColumnId,
        active: &ItemId,
        dest_index: usize,
    ) -> Result<Option<BoardState>> {
        let source_items = self
            .buckets
            .get(source)
            .ok_or_else(|| BoardError::ColumnNotFound(source.to_string()))?;
        let from = source_items
            .iter()
            .position(|item| &item.id == active)
            .ok_or_else(|| BoardError::ItemNotFound(active.to_string()))?;

        if source == dest {
            if dest_index >= source_items.len() {
                return Err(BoardError::InvalidIndex {
                    column: dest.to_string(),
                    index: dest_index,
                    len: source_items.len(),
                });
            }
            if dest_index == from {
                return Ok(None);
            }

            let mut next = self.clone();
            let items = next.bucket_mut(source)?;
            let moved = items.remove(from);
            items.insert(dest_index, moved);
            return Ok(Some(next));
        }

        let dest_len = self
            .buckets
            .get(dest)
            .ok_or_else(|| BoardError::ColumnNotFound(dest.to_string()))?
            .len();
        if dest_index > dest_len {
            return Err(BoardError::InvalidIndex {
                column: dest.to_string(),
                index: dest_index,
                len: dest_len,
            });
        }

        let mut next = self.clone();
        let moved = next.bucket_mut(source)?.remove(from);
        next.bucket_mut(dest)?.insert(dest_index, moved);
        Ok(Some(next))
    }

    /// Replaces one item of a column with `update(&item)`
    pub fn update_item<F>(&mut self, column: &ColumnId, id: &ItemId, update: F) -> Result<()>
    where
        F: FnOnce(&Item) -> Item,
    {
        let items = self.bucket_mut(column)?;
        let slot = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| BoardError::ItemNotFound(id.to_string()))?;
        *slot = update(slot);
        Ok(())
    }

    /// Puts a moved item back at its pre-move column and index, and gives
    /// any respaced siblings their previous orders
    ///
    /// Returns `None` when the item is no longer where the move left it:
    /// another column, or another order in the same column (a later move
    /// or a rebuild got there first).
    pub fn restore(&self, undo: &MoveUndo) -> Option<BoardState> {
        let id = &undo.original.id;
        let at = self.index_of(&undo.applied_column, id)?;
        let current = &self.items_in(&undo.applied_column)[at];
        if current.order_of(undo.field) != undo.applied_order
            || !self.has_column(&undo.source_column)
        {
            return None;
        }

        let mut next = self.clone();
        next.bucket_mut(&undo.applied_column).ok()?.remove(at);
        let items = next.bucket_mut(&undo.source_column).ok()?;
        let index = undo.source_index.min(items.len());
        items.insert(index, undo.original.clone());
        next.revert_orders(undo, 0);
        Some(next)
    }

    /// Gives respaced siblings from `skip` on their previous orders,
    /// leaving the moved item in place
    ///
    /// Siblings whose order changed again since the move are left alone.
    /// Returns `None` when nothing was reverted.
    pub fn restore_respaced(&self, undo: &MoveUndo, skip: usize) -> Option<BoardState> {
        let mut next = self.clone();
        (next.revert_orders(undo, skip) > 0).then_some(next)
    }

    fn revert_orders(&mut self, undo: &MoveUndo, skip: usize) -> usize {
        let mut reverted = 0;
        for sibling in undo.respaced.iter().skip(skip) {
            let still_applied = self
                .index_of(&undo.applied_column, &sibling.item_id)
                .map(|at| self.items_in(&undo.applied_column)[at].order_of(undo.field))
                == Some(sibling.applied);
            if !still_applied {
                continue;
            }
            let reset = self.update_item(&undo.applied_column, &sibling.item_id, |item| {
                item.with_position(undo.field, sibling.previous, None)
            });
            if reset.is_ok() {
                reverted += 1;
            }
        }
        reverted
    }

    fn bucket_mut(&mut self, id: &ColumnId) -> Result<&mut Vec<Item>> {
        self.buckets
            .get_mut(id)
            .map(Arc::make_mut)
            .ok_or_else(|| BoardError::ColumnNotFound(id.to_string()))
    }
}
