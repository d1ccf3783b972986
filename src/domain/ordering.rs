//! Fractional ordering for items inside a column.
//!
//! Columns are displayed with the highest order value on top. A moved item
//! gets a single new value computed from its neighbours; no other item is
//! renumbered unless floating-point precision between two neighbours runs
//! out, in which case [`OrderAssigner::rebalance`] spreads the whole column
//! back onto the default gap.

use crate::config::EngineConfig;
use crate::domain::item::{Item, ItemId, OrderField};
use crate::error::{BoardError, Result};
use std::fmt;

/// Where in its column an item lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    Between,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
            Self::Between => write!(f, "between"),
        }
    }
}

/// Neighbour orders relevant to an insertion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    /// Order of the item displayed above the insertion point
    pub before: Option<f64>,
    /// Order of the item displayed below the insertion point
    pub after: Option<f64>,
}

/// Computes order values with gap-based fractional indexing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderAssigner {
    gap: f64,
    min_order: f64,
}

impl OrderAssigner {
    pub fn new(gap: f64, min_order: f64) -> Self {
        Self { gap, min_order }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.order_gap, config.min_order)
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// New order value for an item inserted at `position`
    ///
    /// * `Top`: `after + gap`, or `gap` alone in an empty column
    /// * `Bottom`: half of `before`, or `min_order` with no predecessor
    /// * `Between`: mean of both neighbours; with only one, half of it
    pub fn assign(&self, position: Position, before: Option<f64>, after: Option<f64>) -> f64 {
        match position {
            Position::Top => after.map_or(self.gap, |after| after + self.gap),
            Position::Bottom => match before {
                Some(before) if before > 0.0 => before / 2.0,
                // Halving cannot go below a non-positive order
                Some(before) => before - self.gap,
                None => self.min_order,
            },
            Position::Between => match (before, after) {
                (Some(before), Some(after)) => (before + after) / 2.0,
                (Some(only), None) | (None, Some(only)) => only / 2.0,
                (None, None) => self.gap,
            },
        }
    }

    /// Like [`assign`](Self::assign), but fails when the result does not
    /// sort strictly against its neighbours
    pub fn assign_checked(
        &self,
        position: Position,
        before: Option<f64>,
        after: Option<f64>,
    ) -> Result<f64> {
        let value = self.assign(position, before, after);

        let fits = value.is_finite()
            && match position {
                Position::Top => after.map_or(true, |after| value > after),
                // Halving a tiny positive order can underflow to zero
                Position::Bottom => before.map_or(true, |before| {
                    value < before && (before <= 0.0 || value > 0.0)
                }),
                Position::Between => match (before, after) {
                    (Some(before), Some(after)) => {
                        let (low, high) = if before < after {
                            (before, after)
                        } else {
                            (after, before)
                        };
                        low < value && value < high
                    }
                    _ => true,
                },
            };

        if fits {
            Ok(value)
        } else {
            Err(BoardError::OrderSpaceExhausted { before, after })
        }
    }

    /// Works out the placement of `items[index]` in an already spliced
    /// destination sequence
    ///
    /// The first slot is placed above the greatest remaining order and the
    /// last slot below the smallest one, so the result stays extreme even in
    /// a column whose stored orders are not sorted.
    pub fn plan(items: &[Item], index: usize, field: OrderField) -> Placement {
        let others = || {
            items
                .iter()
                .enumerate()
                .filter(move |(i, _)| *i != index)
                .map(move |(_, item)| item.order_of(field))
        };

        if index == 0 || items.len() <= 1 {
            Placement {
                position: Position::Top,
                before: None,
                after: others().reduce(f64::max),
            }
        } else if index + 1 >= items.len() {
            Placement {
                position: Position::Bottom,
                before: others().reduce(f64::min),
                after: None,
            }
        } else {
            Placement {
                position: Position::Between,
                before: Some(items[index - 1].order_of(field)),
                after: Some(items[index + 1].order_of(field)),
            }
        }
    }

    /// Plans and assigns the order for `items[index]`
    pub fn order_for(&self, items: &[Item], index: usize, field: OrderField) -> Result<f64> {
        let placement = Self::plan(items, index, field);
        self.assign_checked(placement.position, placement.before, placement.after)
    }

    /// Evenly respaced orders for a whole column, top item highest
    pub fn rebalance(&self, items: &[Item]) -> Vec<(ItemId, f64)> {
        let count = items.len();
        items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), (count - i) as f64 * self.gap))
            .collect()
    }
}

impl Default for OrderAssigner {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::ColumnId;

    fn items(orders: &[(&str, f64)]) -> Vec<Item> {
        orders
            .iter()
            .map(|(id, order)| Item::new(*id, Some(ColumnId::from("a")), *order))
            .collect()
    }

    #[test]
    fn test_top_adds_gap() {
        let assigner = OrderAssigner::default();
        assert_eq!(assigner.assign(Position::Top, None, Some(30.0)), 1030.0);
        assert_eq!(assigner.assign(Position::Top, None, None), 1000.0);
    }

    #[test]
    fn test_bottom_halves_predecessor() {
        let assigner = OrderAssigner::default();
        assert_eq!(assigner.assign(Position::Bottom, Some(10.0), None), 5.0);
        assert_eq!(assigner.assign(Position::Bottom, None, None), 0.01);
    }

    #[test]
    fn test_bottom_below_non_positive_predecessor() {
        let assigner = OrderAssigner::default();
        let value = assigner.assign_checked(Position::Bottom, Some(0.0), None).unwrap();
        assert!(value < 0.0);
    }

    #[test]
    fn test_bottom_never_reaches_zero() {
        let assigner = OrderAssigner::default();
        let smallest = f64::from_bits(1);
        assert!(matches!(
            assigner.assign_checked(Position::Bottom, Some(smallest), None),
            Err(BoardError::OrderSpaceExhausted { .. })
        ));

        let tiny = f64::MIN_POSITIVE;
        let value = assigner.assign_checked(Position::Bottom, Some(tiny), None).unwrap();
        assert!(value > 0.0 && value < tiny);
    }

    #[test]
    fn test_between_is_mean() {
        let assigner = OrderAssigner::default();
        assert_eq!(assigner.assign(Position::Between, Some(10.0), Some(30.0)), 20.0);
        assert_eq!(assigner.assign(Position::Between, Some(30.0), None), 15.0);
        assert_eq!(assigner.assign(Position::Between, None, Some(30.0)), 15.0);
        assert_eq!(assigner.assign(Position::Between, None, None), 1000.0);
    }

    #[test]
    fn test_between_is_strict() {
        let assigner = OrderAssigner::default();
        let pairs = [(1.0, 2.0), (0.01, 0.02), (999.0, 1000.0), (-5.0, 7.5)];
        for (a, b) in pairs {
            let x = assigner.assign_checked(Position::Between, Some(a), Some(b)).unwrap();
            assert!(a < x && x < b, "{a} < {x} < {b}");
        }
    }

    #[test]
    fn test_precision_exhaustion_is_detected() {
        let assigner = OrderAssigner::default();
        let mut low = 1.0_f64;
        let high = 2.0_f64;

        let mut exhausted = false;
        for _ in 0..200 {
            match assigner.assign_checked(Position::Between, Some(high), Some(low)) {
                Ok(value) => low = value,
                Err(BoardError::OrderSpaceExhausted { .. }) => {
                    exhausted = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(exhausted);
    }

    #[test]
    fn test_equal_neighbours_are_exhausted() {
        let assigner = OrderAssigner::default();
        assert!(assigner
            .assign_checked(Position::Between, Some(5.0), Some(5.0))
            .is_err());
    }

    #[test]
    fn test_plan_top_uses_greatest_remaining_order() {
        // y moved to the top of [x, z]
        let column = items(&[("y", 20.0), ("x", 10.0), ("z", 30.0)]);
        let placement = OrderAssigner::plan(&column, 0, OrderField::Order);

        assert_eq!(placement.position, Position::Top);
        assert_eq!(placement.after, Some(30.0));

        let order = OrderAssigner::default()
            .order_for(&column, 0, OrderField::Order)
            .unwrap();
        assert_eq!(order, 1030.0);
    }

    #[test]
    fn test_plan_between_uses_adjacent_items() {
        let column = items(&[("x", 10.0), ("new", 0.0), ("z", 30.0)]);
        let placement = OrderAssigner::plan(&column, 1, OrderField::Order);

        assert_eq!(placement.position, Position::Between);
        assert_eq!(
            OrderAssigner::default()
                .order_for(&column, 1, OrderField::Order)
                .unwrap(),
            20.0
        );
    }

    #[test]
    fn test_plan_bottom_uses_smallest_remaining_order() {
        let column = items(&[("a", 3000.0), ("b", 2000.0), ("moved", 9999.0)]);
        let placement = OrderAssigner::plan(&column, 2, OrderField::Order);

        assert_eq!(placement.position, Position::Bottom);
        assert_eq!(placement.before, Some(2000.0));
        assert_eq!(
            OrderAssigner::default()
                .order_for(&column, 2, OrderField::Order)
                .unwrap(),
            1000.0
        );
    }

    #[test]
    fn test_plan_lone_item_gets_default_gap() {
        let column = items(&[("w", 123.0)]);
        assert_eq!(
            OrderAssigner::default()
                .order_for(&column, 0, OrderField::Order)
                .unwrap(),
            1000.0
        );
    }

    #[test]
    fn test_plan_reads_requested_field() {
        let column = vec![
            Item::new("a", None, 1.0).with_inner_order(50.0),
            Item::new("b", None, 2.0).with_inner_order(40.0),
        ];
        let placement = OrderAssigner::plan(&column, 0, OrderField::InnerOrder);
        assert_eq!(placement.after, Some(40.0));
    }

    #[test]
    fn test_top_and_bottom_are_monotonic() {
        let assigner = OrderAssigner::default();
        let column = items(&[("a", 700.0), ("b", 350.0), ("c", 12.5)]);

        let mut with_top = vec![Item::new("new", None, 0.0)];
        with_top.extend(column.iter().cloned());
        let top = assigner.order_for(&with_top, 0, OrderField::Order).unwrap();
        assert!(top > column[0].order);

        let mut with_bottom = column.clone();
        with_bottom.push(Item::new("new", None, 0.0));
        let bottom = assigner
            .order_for(&with_bottom, with_bottom.len() - 1, OrderField::Order)
            .unwrap();
        assert!(bottom < column[2].order);
        assert!(bottom > 0.0);
    }

    #[test]
    fn test_rebalance_spreads_column() {
        let assigner = OrderAssigner::default();
        let column = items(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);

        let orders = assigner.rebalance(&column);
        assert_eq!(
            orders,
            vec![
                (ItemId::from("a"), 3000.0),
                (ItemId::from("b"), 2000.0),
                (ItemId::from("c"), 1000.0),
            ]
        );
    }
}
