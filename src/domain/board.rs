use crate::config::EngineConfig;
use crate::domain::item::{ColumnId, GroupBy};
use serde::{Deserialize, Serialize};

/// Configuration for a board column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i32,
}

impl Column {
    const FALLBACK_TITLE: &'static str = "No Title";
    const FALLBACK_COLOR: &'static str = "#f0f0f0";

    pub fn new(id: impl Into<String>, title: impl Into<String>, order: i32) -> Self {
        Self {
            id: ColumnId::new(id),
            title: Some(title.into()),
            color: None,
            order,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => Self::FALLBACK_TITLE,
        }
    }

    pub fn header_color(&self) -> &str {
        match self.color.as_deref() {
            Some(color) if !color.is_empty() => color,
            _ => Self::FALLBACK_COLOR,
        }
    }

    /// White text on a configured colour, black on the fallback
    pub fn text_color(&self) -> &'static str {
        match self.color.as_deref() {
            Some(color) if !color.is_empty() => "#fff",
            _ => "#000",
        }
    }
}

/// Persisted board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl BoardConfig {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            group_by: GroupBy::Column,
            engine: EngineConfig::default(),
        }
    }

    /// Gets the column configuration for an id
    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|col| &col.id == id)
    }

    /// Columns in display order (stable on equal `order`)
    pub fn sorted_columns(&self) -> Vec<Column> {
        let mut columns = self.columns.clone();
        columns.sort_by_key(|col| col.order);
        columns
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::new(
            "Sales Pipeline",
            vec![
                Column::new("new", "New", 0).with_color("#1677ff"),
                Column::new("contacted", "Contacted", 1).with_color("#13c2c2"),
                Column::new("qualified", "Qualified", 2).with_color("#faad14"),
                Column::new("won", "Won", 3).with_color("#52c41a"),
                Column::new("lost", "Lost", 4),
            ],
        )
    }
}
