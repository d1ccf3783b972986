//! Drop-target resolution.
//!
//! Two phases: rectangle intersection first, closest corners when nothing
//! intersects. Virtualized columns unmount their off-screen items, so a
//! dragged card hovering over the empty scroll area of a long column often
//! intersects nothing at all; the corner fallback still finds the nearest
//! mounted target there.

use crate::dnd::geometry::Rect;
use crate::domain::item::{ColumnId, ItemId};
use serde::{Deserialize, Serialize};

/// Something a dragged item can be dropped on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum DropTarget {
    /// The column area itself (empty space or an empty column)
    Column(ColumnId),
    /// Another item; the dragged item takes its slot
    Item(ItemId),
}

impl DropTarget {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Column(id) => id.as_str(),
            Self::Item(id) => id.as_str(),
        }
    }
}

/// A mounted drop target and its current bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Droppable {
    pub target: DropTarget,
    pub rect: Rect,
}

impl Droppable {
    pub fn column(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            target: DropTarget::Column(ColumnId::new(id)),
            rect,
        }
    }

    pub fn item(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            target: DropTarget::Item(ItemId::new(id)),
            rect,
        }
    }
}

/// Picks the drop target for the dragged rectangle
///
/// Returns `None` only when `candidates` is empty. Ties go to the earlier
/// candidate.
pub fn resolve(dragged: &Rect, candidates: &[Droppable]) -> Option<DropTarget> {
    let hit = rect_intersection(dragged, candidates).or_else(|| closest_corners(dragged, candidates));
    tracing::trace!(?hit, candidates = candidates.len(), "resolved drop target");
    hit.map(|index| candidates[index].target.clone())
}

/// Candidate with the greatest intersection ratio, if any intersects
///
/// The ratio is shared area over combined area, so a card wholly inside a
/// tall column still prefers a sibling card it mostly covers.
fn rect_intersection(dragged: &Rect, candidates: &[Droppable]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let shared = dragged.intersection_area(&candidate.rect);
        if shared <= 0.0 {
            continue;
        }
        let ratio = shared / (dragged.area() + candidate.rect.area() - shared);
        if best.map_or(true, |(_, current)| ratio > current) {
            best = Some((index, ratio));
        }
    }

    best.map(|(index, _)| index)
}

/// Candidate whose corners are on average nearest the dragged corners
fn closest_corners(dragged: &Rect, candidates: &[Droppable]) -> Option<usize> {
    let corners = dragged.corners();
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let distance = corners
            .iter()
            .zip(candidate.rect.corners().iter())
            .map(|(a, b)| a.distance_to(*b))
            .sum::<f64>()
            / 4.0;
        if best.map_or(true, |(_, current)| distance < current) {
            best = Some((index, distance));
        }
    }

    best.map(|(index, _)| index)
}
