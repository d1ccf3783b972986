use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier of a board item, stable across moves
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a column (a status, or any other grouping bucket)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Bucket for items that carry no grouping key. Never rendered.
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for ColumnId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which numeric field serializes an item's position in its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    Order,
    InnerOrder,
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order => write!(f, "order"),
            Self::InnerOrder => write!(f, "innerOrder"),
        }
    }
}

/// Dimension a board partitions its items by
///
/// `Column` is the primary status board: items are grouped by their
/// `column_key`, sequenced by `order`, and moves are persisted.
/// `Attribute` groups by a named display attribute and sequences by
/// `inner_order`; moves on such a board stay local.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "field")]
pub enum GroupBy {
    #[default]
    Column,
    Attribute(String),
}

impl GroupBy {
    /// Returns the bucket an item belongs to under this grouping
    pub fn key_of(&self, item: &Item) -> Option<ColumnId> {
        match self {
            Self::Column => item.column_key.clone(),
            Self::Attribute(field) => match item.attributes.get(field) {
                Some(Value::String(s)) if !s.is_empty() => Some(ColumnId::new(s.clone())),
                Some(Value::Number(n)) => Some(ColumnId::new(n.to_string())),
                _ => None,
            },
        }
    }

    pub fn order_field(&self) -> OrderField {
        match self {
            Self::Column => OrderField::Order,
            Self::Attribute(_) => OrderField::InnerOrder,
        }
    }

    /// Whether moves under this grouping are written to the remote store
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Column)
    }
}

/// A business record placed on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub column_key: Option<ColumnId>,
    #[serde(default)]
    pub order: f64,
    #[serde(default)]
    pub inner_order: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, column_key: Option<ColumnId>, order: f64) -> Self {
        Self {
            id: id.into(),
            column_key,
            order,
            inner_order: 0.0,
            status_updated_at: None,
            attributes: Map::new(),
        }
    }

    /// Adds a display attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_inner_order(mut self, inner_order: f64) -> Self {
        self.inner_order = inner_order;
        self
    }

    pub fn order_of(&self, field: OrderField) -> f64 {
        match field {
            OrderField::Order => self.order,
            OrderField::InnerOrder => self.inner_order,
        }
    }

    /// Shallow copy carrying a new sequence value and, if given, a new column
    pub fn with_position(&self, field: OrderField, order: f64, column_key: Option<ColumnId>) -> Self {
        let mut moved = self.clone();
        match field {
            OrderField::Order => moved.order = order,
            OrderField::InnerOrder => moved.inner_order = order,
        }
        if let Some(key) = column_key {
            if moved.column_key.as_ref() != Some(&key) {
                moved.status_updated_at = Some(Utc::now());
            }
            moved.column_key = Some(key);
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_column_key() {
        let item = Item::new("L1", Some(ColumnId::from("new")), 10.0);
        assert_eq!(GroupBy::Column.key_of(&item), Some(ColumnId::from("new")));

        let orphan = Item::new("L2", None, 10.0);
        assert_eq!(GroupBy::Column.key_of(&orphan), None);
    }

    #[test]
    fn test_group_by_attribute() {
        let by_priority = GroupBy::Attribute("priority".to_string());

        let item = Item::new("L1", None, 1.0).with_attribute("priority", "high");
        assert_eq!(by_priority.key_of(&item), Some(ColumnId::from("high")));

        let numeric = Item::new("L2", None, 1.0).with_attribute("priority", 3);
        assert_eq!(by_priority.key_of(&numeric), Some(ColumnId::from("3")));

        let missing = Item::new("L3", None, 1.0);
        assert_eq!(by_priority.key_of(&missing), None);

        let blank = Item::new("L4", None, 1.0).with_attribute("priority", "");
        assert_eq!(by_priority.key_of(&blank), None);
    }

    #[test]
    fn test_order_field_per_grouping() {
        assert_eq!(GroupBy::Column.order_field(), OrderField::Order);
        assert_eq!(
            GroupBy::Attribute("priority".to_string()).order_field(),
            OrderField::InnerOrder
        );
        assert!(GroupBy::Column.is_primary());
        assert!(!GroupBy::Attribute("priority".to_string()).is_primary());
    }

    #[test]
    fn test_with_position_stamps_column_change() {
        let item = Item::new("L1", Some(ColumnId::from("new")), 10.0);

        let reordered = item.with_position(OrderField::Order, 20.0, None);
        assert_eq!(reordered.order, 20.0);
        assert!(reordered.status_updated_at.is_none());

        let moved = item.with_position(OrderField::Order, 5.0, Some(ColumnId::from("won")));
        assert_eq!(moved.column_key, Some(ColumnId::from("won")));
        assert!(moved.status_updated_at.is_some());

        // Original snapshot is untouched
        assert_eq!(item.order, 10.0);
        assert_eq!(item.column_key, Some(ColumnId::from("new")));
    }

    #[test]
    fn test_inner_order_position() {
        let item = Item::new("L1", None, 10.0).with_inner_order(3.0);
        let moved = item.with_position(OrderField::InnerOrder, 7.0, None);
        assert_eq!(moved.inner_order, 7.0);
        assert_eq!(moved.order, 10.0);
    }

    #[test]
    fn test_item_deserialization_keeps_attributes() {
        let json = r#"{
            "id": "L1",
            "columnKey": "new",
            "order": 1000,
            "innerOrder": 2,
            "title": "Acme Corp",
            "phone": "+100"
        }"#;

        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "L1");
        assert_eq!(item.column_key, Some(ColumnId::from("new")));
        assert_eq!(item.order, 1000.0);
        assert_eq!(item.inner_order, 2.0);
        assert_eq!(item.attributes.get("title"), Some(&Value::from("Acme Corp")));
    }

    #[test]
    fn test_item_without_grouping_key_deserializes() {
        let item: Item = serde_json::from_str(r#"{ "id": "L9" }"#).unwrap();
        assert!(item.column_key.is_none());
        assert_eq!(item.order, 0.0);
    }
}
