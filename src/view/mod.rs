pub mod virtualizer;

pub use virtualizer::{ColumnVirtualizer, VirtualItem, VirtualItems, VirtualizerOptions};

use crate::config::EngineConfig;
use crate::domain::{BoardState, Column, ColumnId, Item};

/// What the host renders for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView<'a> {
    pub column: &'a Column,
    pub items: &'a [Item],
    /// Render through a [`ColumnVirtualizer`] window instead of in full
    pub virtualized: bool,
    /// The current drag target is in this column
    pub highlighted: bool,
}

impl ColumnView<'_> {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Header text, e.g. `Qualified (12)`
    pub fn header_label(&self) -> String {
        format!("{} ({})", self.column.display_title(), self.count())
    }
}

/// Builds column views in display order
///
/// Buckets without a configured column (unassigned or unknown keys) are
/// not rendered.
pub fn column_views<'a>(
    board: &'a BoardState,
    columns: &'a [Column],
    config: &EngineConfig,
    over: Option<&ColumnId>,
) -> Vec<ColumnView<'a>> {
    board
        .columns()
        .iter()
        .filter_map(|id| columns.iter().find(|column| &column.id == id))
        .map(|column| {
            let items = board.items_in(&column.id);
            ColumnView {
                column,
                items,
                virtualized: items.len() > config.virtualize_threshold,
                highlighted: over == Some(&column.id),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupBy;

    #[test]
    fn test_column_views() {
        let columns = vec![
            Column::new("b", "Qualified", 1),
            Column::new("a", "New", 0),
        ];
        let mut items: Vec<Item> = (0..16)
            .map(|i| Item::new(format!("L{i}").as_str(), Some(ColumnId::from("a")), i as f64))
            .collect();
        items.push(Item::new("orphan", None, 0.0));
        let board = BoardState::from_grouping(items, &columns, &GroupBy::Column);

        let over = ColumnId::from("b");
        let views = column_views(&board, &columns, &EngineConfig::default(), Some(&over));

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].header_label(), "New (16)");
        assert!(views[0].virtualized);
        assert!(!views[0].highlighted);
        assert_eq!(views[1].header_label(), "Qualified (0)");
        assert!(!views[1].virtualized);
        assert!(views[1].highlighted);
    }
}
