use crate::{
    domain::{ColumnId, Item, ItemId, OrderField},
    error::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "file-storage")]
pub mod file_storage;

/// Partial update sent for a moved item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    /// New column, only when the item changed column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_key: Option<ColumnId>,
    pub field: OrderField,
    pub order: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_updated_at: Option<DateTime<Utc>>,
}

impl ItemPatch {
    /// Applies the patch to a stored item
    pub fn apply(&self, item: &Item) -> Item {
        let mut patched = item.with_position(self.field, self.order, None);
        if let Some(column) = &self.column_key {
            patched.column_key = Some(column.clone());
        }
        if let Some(at) = self.status_updated_at {
            patched.status_updated_at = Some(at);
        }
        patched
    }
}

/// Remote item collection the board writes moves to
///
/// Any CRUD client that can update one record by id can back a board.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Updates the item `id` with `patch`
    async fn update_one(&self, id: &ItemId, patch: &ItemPatch) -> Result<()>;

    /// Lists every item, used to rebuild a board after invalidation
    async fn list_items(&self) -> Result<Vec<Item>>;
}
