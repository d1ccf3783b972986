//! Per-column windowing.
//!
//! Small columns render every item. Once a column holds more items than
//! the threshold, only the items intersecting the viewport plus an overscan
//! margin on each side are produced. Item sizes start out estimated and are
//! replaced by measured sizes as the renderer reports them; offsets are kept
//! as prefix sums so lookups are a binary search.

use crate::config::EngineConfig;
use crate::domain::item::{Item, ItemId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Estimated size of the item at an index
pub type SizeEstimator = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct VirtualizerOptions {
    pub overscan: usize,
    pub threshold: usize,
    pub estimated_size: f64,
    pub viewport_size: f64,
    pub estimator: Option<SizeEstimator>,
}

impl VirtualizerOptions {
    pub fn from_config(config: &EngineConfig, viewport_size: f64) -> Self {
        Self {
            overscan: config.overscan,
            threshold: config.virtualize_threshold,
            estimated_size: config.estimated_item_size,
            viewport_size,
            estimator: None,
        }
    }

    pub fn with_estimator(mut self, estimator: impl Fn(usize) -> f64 + Send + Sync + 'static) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }
}

impl fmt::Debug for VirtualizerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualizerOptions")
            .field("overscan", &self.overscan)
            .field("threshold", &self.threshold)
            .field("estimated_size", &self.estimated_size)
            .field("viewport_size", &self.viewport_size)
            .field("estimator", &self.estimator.is_some())
            .finish()
    }
}

/// One item slot to render
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub key: ItemId,
    /// Distance from the top of the column content
    pub offset: f64,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct ColumnVirtualizer {
    options: VirtualizerOptions,
    keys: Vec<ItemId>,
    measured: HashMap<ItemId, f64>,
    /// `offsets[i]` is the start of item `i`; the last entry is the total
    offsets: Vec<f64>,
    scroll_offset: f64,
}

impl ColumnVirtualizer {
    pub fn new(options: VirtualizerOptions) -> Self {
        Self {
            options,
            keys: Vec::new(),
            measured: HashMap::new(),
            offsets: vec![0.0],
            scroll_offset: 0.0,
        }
    }

    /// Replaces the column's items, keeping measurements of items still present
    pub fn set_items<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.keys = keys.into_iter().collect();
        let present: HashSet<&ItemId> = self.keys.iter().collect();
        self.measured.retain(|key, _| present.contains(key));
        self.recompute();
    }

    pub fn sync_items(&mut self, items: &[Item]) {
        self.set_items(items.iter().map(|item| item.id.clone()));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether the column is windowed rather than rendered in full
    pub fn is_virtualized(&self) -> bool {
        self.keys.len() > self.options.threshold
    }

    pub fn set_viewport_size(&mut self, size: f64) {
        self.options.viewport_size = size.max(0.0);
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset.max(0.0);
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Records the rendered size of an item
    ///
    /// Returns whether any offset changed.
    pub fn measure(&mut self, key: &ItemId, size: f64) -> bool {
        if !size.is_finite() || size < 0.0 || !self.keys.contains(key) {
            return false;
        }
        if self.measured.get(key) == Some(&size) {
            return false;
        }
        self.measured.insert(key.clone(), size);
        self.recompute();
        true
    }

    pub fn total_size(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Start offset of the item at `index`, for scrolling it into view
    pub fn offset_for_index(&self, index: usize) -> Option<f64> {
        if index < self.keys.len() {
            self.offsets.get(index).copied()
        } else {
            None
        }
    }

    /// Indices to render, overscan included
    pub fn visible_range(&self) -> Range<usize> {
        let count = self.keys.len();
        if !self.is_virtualized() {
            return 0..count;
        }

        let window = self.viewport_range();
        let overscan = self.options.overscan;
        window.start.saturating_sub(overscan)..(window.end + overscan).min(count)
    }

    /// Items rendered this frame; call again after any change
    pub fn virtual_items(&self) -> VirtualItems<'_> {
        VirtualItems {
            virtualizer: self,
            range: self.visible_range(),
        }
    }

    /// Indices intersecting the viewport, without overscan
    fn viewport_range(&self) -> Range<usize> {
        let count = self.keys.len();
        let top = self.scroll_offset;
        let bottom = top + self.options.viewport_size;

        let ends = &self.offsets[1..];
        let starts = &self.offsets[..count];
        let start = ends.partition_point(|&end| end <= top).min(count);
        let end = starts.partition_point(|&start| start < bottom).max(start);
        start..end
    }

    fn size_of(&self, index: usize) -> f64 {
        if let Some(size) = self.measured.get(&self.keys[index]) {
            return *size;
        }
        match &self.options.estimator {
            Some(estimate) => estimate(index),
            None => self.options.estimated_size,
        }
    }

    fn recompute(&mut self) {
        let mut offsets = Vec::with_capacity(self.keys.len() + 1);
        let mut total = 0.0;
        offsets.push(total);
        for index in 0..self.keys.len() {
            total += self.size_of(index);
            offsets.push(total);
        }
        self.offsets = offsets;
    }
}

/// Lazy iterator over the rendered slots of a column
pub struct VirtualItems<'a> {
    virtualizer: &'a ColumnVirtualizer,
    range: Range<usize>,
}

impl Iterator for VirtualItems<'_> {
    type Item = VirtualItem;

    fn next(&mut self) -> Option<VirtualItem> {
        let index = self.range.next()?;
        let offsets = &self.virtualizer.offsets;
        Some(VirtualItem {
            index,
            key: self.virtualizer.keys[index].clone(),
            offset: offsets[index],
            size: offsets[index + 1] - offsets[index],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for VirtualItems<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(count: usize) -> Vec<ItemId> {
        (0..count).map(|i| ItemId::new(format!("L{i}"))).collect()
    }

    fn virtualizer(count: usize, viewport: f64) -> ColumnVirtualizer {
        let options = VirtualizerOptions::from_config(&EngineConfig::default(), viewport);
        let mut virtualizer = ColumnVirtualizer::new(options);
        virtualizer.set_items(keys(count));
        virtualizer
    }

    #[test]
    fn test_small_column_renders_everything() {
        let virtualizer = virtualizer(15, 240.0);
        assert!(!virtualizer.is_virtualized());
        assert_eq!(virtualizer.virtual_items().count(), 15);
        assert_eq!(virtualizer.visible_range(), 0..15);
    }

    #[test]
    fn test_large_column_is_windowed() {
        // 240px viewport shows 2 items of 120px, plus 3 overscan below
        let virtualizer = virtualizer(100, 240.0);
        assert!(virtualizer.is_virtualized());
        assert_eq!(virtualizer.visible_range(), 0..5);
        assert_eq!(virtualizer.total_size(), 12_000.0);
    }

    #[test]
    fn test_scrolled_window_has_overscan_both_sides() {
        let mut virtualizer = virtualizer(100, 240.0);
        virtualizer.set_scroll_offset(1200.0);

        // Items 10 and 11 are visible
        assert_eq!(virtualizer.visible_range(), 7..15);
        let items: Vec<_> = virtualizer.virtual_items().collect();
        assert_eq!(items.len(), 8);
        assert_eq!(items[0].index, 7);
        assert_eq!(items[0].offset, 840.0);
        assert_eq!(items[0].key, ItemId::from("L7"));
    }

    #[test]
    fn test_window_never_exceeds_visible_plus_overscan() {
        let overscan = EngineConfig::default().overscan;
        for scroll in [0.0, 55.0, 600.0, 5_000.0, 11_900.0, 50_000.0] {
            let mut virtualizer = virtualizer(100, 500.0);
            virtualizer.set_scroll_offset(scroll);

            let visible = virtualizer.viewport_range().len();
            let rendered = virtualizer.virtual_items().count();
            assert!(rendered <= visible + 2 * overscan, "scroll {scroll}");
        }
    }

    #[test]
    fn test_partial_item_at_top_is_visible() {
        let mut virtualizer = virtualizer(100, 240.0);
        virtualizer.set_scroll_offset(130.0);
        // Item 1 spans 120..240, item 3 spans 360..480
        assert_eq!(virtualizer.viewport_range(), 1..4);
    }

    #[test]
    fn test_measurement_shifts_offsets() {
        let mut virtualizer = virtualizer(20, 240.0);

        assert!(virtualizer.measure(&ItemId::from("L0"), 200.0));
        assert_eq!(virtualizer.offset_for_index(1), Some(200.0));
        assert_eq!(virtualizer.total_size(), 200.0 + 19.0 * 120.0);

        // Same size again changes nothing
        assert!(!virtualizer.measure(&ItemId::from("L0"), 200.0));
        // Unknown keys and bad sizes are ignored
        assert!(!virtualizer.measure(&ItemId::from("ghost"), 10.0));
        assert!(!virtualizer.measure(&ItemId::from("L1"), f64::NAN));
    }

    #[test]
    fn test_measurements_follow_items_across_reorder() {
        let mut virtualizer = virtualizer(20, 240.0);
        virtualizer.measure(&ItemId::from("L1"), 60.0);

        let mut reordered = keys(20);
        reordered.swap(0, 1);
        virtualizer.set_items(reordered);

        let first = virtualizer.virtual_items().next().unwrap();
        assert_eq!(first.key, ItemId::from("L1"));
        assert_eq!(first.size, 60.0);
    }

    #[test]
    fn test_measurements_dropped_for_removed_items() {
        let mut virtualizer = virtualizer(20, 240.0);
        virtualizer.measure(&ItemId::from("L19"), 60.0);
        virtualizer.set_items(keys(19));
        virtualizer.set_items(keys(20));
        assert_eq!(virtualizer.offset_for_index(19), Some(19.0 * 120.0));
        assert_eq!(virtualizer.total_size(), 20.0 * 120.0);
    }

    #[test]
    fn test_custom_estimator() {
        let options = VirtualizerOptions::from_config(&EngineConfig::default(), 100.0)
            .with_estimator(|index| if index % 2 == 0 { 50.0 } else { 100.0 });
        let mut virtualizer = ColumnVirtualizer::new(options);
        virtualizer.set_items(keys(4));

        assert_eq!(virtualizer.total_size(), 300.0);
        assert_eq!(virtualizer.offset_for_index(2), Some(150.0));
        assert_eq!(virtualizer.offset_for_index(4), None);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let mut virtualizer = virtualizer(50, 240.0);
        virtualizer.set_scroll_offset(600.0);

        let first: Vec<_> = virtualizer.virtual_items().collect();
        let second: Vec<_> = virtualizer.virtual_items().collect();
        assert_eq!(first, second);
        assert_eq!(virtualizer.virtual_items().len(), first.len());
    }

    #[test]
    fn test_empty_column() {
        let virtualizer = virtualizer(0, 240.0);
        assert!(virtualizer.is_empty());
        assert_eq!(virtualizer.virtual_items().count(), 0);
        assert_eq!(virtualizer.total_size(), 0.0);
    }
}
