use crate::error::{BoardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for drag activation, ordering and column virtualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pointer travel (px) before a press turns into a drag
    pub activation_distance: f64,
    /// Columns with more items than this are windowed
    pub virtualize_threshold: usize,
    /// Extra items rendered above and below the viewport
    pub overscan: usize,
    /// Size assumed for items that have not been measured yet
    pub estimated_item_size: f64,
    /// Spacing between order values at the top of a column
    pub order_gap: f64,
    /// Order used for the bottom of a column with no predecessor
    pub min_order: f64,
    /// Cache key invalidated after a successful move
    pub query_key: String,
}

impl EngineConfig {
    pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 8.0;
    pub const DEFAULT_VIRTUALIZE_THRESHOLD: usize = 15;
    pub const DEFAULT_OVERSCAN: usize = 3;
    pub const DEFAULT_ESTIMATED_ITEM_SIZE: f64 = 120.0;
    pub const DEFAULT_ORDER_GAP: f64 = 1000.0;
    pub const DEFAULT_MIN_ORDER: f64 = 0.01;
    pub const DEFAULT_QUERY_KEY: &'static str = "leads";

    /// Parses a JSON document, falling back to defaults for missing fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON config file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&contents)
    }

    /// Rejects values the ordering and windowing code cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.activation_distance.is_finite() || self.activation_distance < 0.0 {
            return Err(BoardError::ConfigError(format!(
                "activation_distance must be a non-negative number, got {}",
                self.activation_distance
            )));
        }
        if !(self.order_gap.is_finite() && self.order_gap > 0.0) {
            return Err(BoardError::ConfigError(format!(
                "order_gap must be positive, got {}",
                self.order_gap
            )));
        }
        if !(self.min_order.is_finite() && self.min_order > 0.0) {
            return Err(BoardError::ConfigError(format!(
                "min_order must be positive, got {}",
                self.min_order
            )));
        }
        if !(self.estimated_item_size.is_finite() && self.estimated_item_size > 0.0) {
            return Err(BoardError::ConfigError(format!(
                "estimated_item_size must be positive, got {}",
                self.estimated_item_size
            )));
        }
        if self.query_key.is_empty() {
            return Err(BoardError::ConfigError(
                "query_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation_distance: Self::DEFAULT_ACTIVATION_DISTANCE,
            virtualize_threshold: Self::DEFAULT_VIRTUALIZE_THRESHOLD,
            overscan: Self::DEFAULT_OVERSCAN,
            estimated_item_size: Self::DEFAULT_ESTIMATED_ITEM_SIZE,
            order_gap: Self::DEFAULT_ORDER_GAP,
            min_order: Self::DEFAULT_MIN_ORDER,
            query_key: Self::DEFAULT_QUERY_KEY.to_string(),
        }
    }
}
