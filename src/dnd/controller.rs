//! Drag lifecycle state machine.
//!
//! # Phases
//!
//! 1. `Idle`: no drag. A pointer press arms the controller but stays `Idle`
//!    until the pointer travels the activation distance; releasing before
//!    that is a click.
//! 2. `Dragging`: every move re-resolves the drop target. The board is not
//!    touched until release.
//! 3. `Committing`: the move has been applied to a new [`BoardState`] and
//!    is waiting for the host to dispatch persistence and call
//!    [`DragController::settle`].
//!
//! Releasing without a target, or with ids the board cannot resolve,
//! returns to `Idle` with no state change.

use crate::config::EngineConfig;
use crate::dnd::collision::{self, DropTarget, Droppable};
use crate::dnd::geometry::{Point, Rect};
use crate::dnd::keyboard::{self, Direction};
use crate::domain::item::{ColumnId, GroupBy, Item, ItemId};
use crate::domain::ordering::OrderAssigner;
use crate::domain::state::{BoardState, MoveUndo, RespacedOrder};
use crate::error::{BoardError, Result};
use crate::sync::ItemUpdate;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
    Committing,
}

impl fmt::Display for DragPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dragging => write!(f, "dragging"),
            Self::Committing => write!(f, "committing"),
        }
    }
}

/// Input device that started a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Pointer,
    Keyboard,
}

/// State of one drag gesture, dropped when the gesture ends
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub id: Uuid,
    pub active_item: ItemId,
    /// Column the item was in when the drag started
    pub source_column: ColumnId,
    pub sensor: Sensor,
    pub origin: Point,
    pub initial_rect: Rect,
    pub last_target: Option<DropTarget>,
}

#[derive(Debug, Clone, PartialEq)]
struct ArmedPointer {
    item: ItemId,
    origin: Point,
    rect: Rect,
}

/// A move that has been applied locally
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Board after the move
    pub state: BoardState,
    pub item_id: ItemId,
    pub source_column: ColumnId,
    pub dest_column: ColumnId,
    pub dest_index: usize,
    pub order: f64,
    pub column_changed: bool,
    /// Remote writes for this move; empty for local-only groupings. The
    /// moved item comes first, followed by any respaced siblings.
    pub updates: Vec<ItemUpdate>,
    pub undo: MoveUndo,
}

/// Order written into the moved item, with what persisting it takes
struct Placed {
    order: f64,
    updates: Vec<ItemUpdate>,
    respaced: Vec<RespacedOrder>,
}

/// Result of releasing a drag
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Pointer released before the activation distance
    Clicked(ItemId),
    /// Nothing to drop on, or the drop could not be resolved
    Aborted,
    /// Dropped where it started
    NoOp,
    Committed(Box<Commit>),
}

/// Drives a drag from sensor input to a commit decision
#[derive(Debug, Clone)]
pub struct DragController {
    activation_distance: f64,
    assigner: OrderAssigner,
    group_by: GroupBy,
    phase: DragPhase,
    armed: Option<ArmedPointer>,
    session: Option<DragSession>,
}

impl DragController {
    pub fn new(config: &EngineConfig, group_by: GroupBy) -> Self {
        Self {
            activation_distance: config.activation_distance,
            assigner: OrderAssigner::from_config(config),
            group_by,
            phase: DragPhase::Idle,
            armed: None,
            session: None,
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn active_item(&self) -> Option<&ItemId> {
        self.session.as_ref().map(|session| &session.active_item)
    }

    pub fn current_target(&self) -> Option<&DropTarget> {
        self.session
            .as_ref()
            .and_then(|session| session.last_target.as_ref())
    }

    /// The dragged item, for rendering the drag overlay
    pub fn overlay_item<'a>(&self, board: &'a BoardState) -> Option<&'a Item> {
        self.active_item().and_then(|id| board.item(id))
    }

    /// Arms a pointer drag on `item`; nothing moves until the threshold
    pub fn pointer_down(&mut self, item: ItemId, origin: Point, rect: Rect) -> Result<()> {
        self.ensure_phase(DragPhase::Idle, DragPhase::Dragging)?;
        self.armed = Some(ArmedPointer { item, origin, rect });
        Ok(())
    }

    /// Feeds a pointer position; returns the current drop target
    pub fn pointer_move(
        &mut self,
        point: Point,
        candidates: &[Droppable],
        board: &BoardState,
    ) -> Option<&DropTarget> {
        if self.phase == DragPhase::Idle {
            let armed = self.armed.as_ref()?;
            if armed.origin.distance_to(point) < self.activation_distance {
                return None;
            }
            let armed = self.armed.take()?;
            let Some(source) = board.find_container(armed.item.as_str()).cloned() else {
                tracing::debug!(item = %armed.item, "drag source not on board, ignoring");
                return None;
            };
            self.start(armed.item, source, Sensor::Pointer, armed.origin, armed.rect);
        }

        if self.phase != DragPhase::Dragging {
            return None;
        }

        let session = self.session.as_mut()?;
        let dragged = session
            .initial_rect
            .translated(point.x - session.origin.x, point.y - session.origin.y);
        session.last_target = collision::resolve(&dragged, candidates);
        session.last_target.as_ref()
    }

    /// Releases the pointer
    pub fn pointer_up(&mut self, board: &BoardState) -> DropOutcome {
        if self.phase == DragPhase::Idle {
            return match self.armed.take() {
                Some(armed) => DropOutcome::Clicked(armed.item),
                None => DropOutcome::Aborted,
            };
        }
        self.release(board)
    }

    /// Picks `item` up with the keyboard; it starts over its own slot
    pub fn keyboard_pick_up(&mut self, item: ItemId, board: &BoardState) -> Result<()> {
        self.ensure_phase(DragPhase::Idle, DragPhase::Dragging)?;
        let source = board
            .find_container(item.as_str())
            .cloned()
            .ok_or_else(|| BoardError::ItemNotFound(item.to_string()))?;

        self.armed = None;
        self.start(item.clone(), source, Sensor::Keyboard, Point::default(), Rect::default());
        if let Some(session) = self.session.as_mut() {
            session.last_target = Some(DropTarget::Item(item));
        }
        Ok(())
    }

    /// Steps the keyboard drag target; returns the current target
    pub fn keyboard_move(&mut self, direction: Direction, board: &BoardState) -> Option<&DropTarget> {
        if self.phase != DragPhase::Dragging {
            return None;
        }
        let session = self.session.as_mut()?;
        if let Some(current) = session.last_target.as_ref() {
            if let Some(next) =
                keyboard::next_target(board, &session.active_item, current, direction)
            {
                session.last_target = Some(next);
            }
        }
        session.last_target.as_ref()
    }

    pub fn keyboard_drop(&mut self, board: &BoardState) -> DropOutcome {
        self.release(board)
    }

    /// Abandons any drag in progress without touching the board
    ///
    /// A drag that already reached `Committing` is not cancellable.
    pub fn cancel(&mut self) -> bool {
        self.armed = None;
        if self.phase == DragPhase::Dragging {
            tracing::debug!("drag cancelled");
            self.reset();
            return true;
        }
        false
    }

    /// Returns to `Idle` once the host has dispatched persistence
    pub fn settle(&mut self) -> Result<()> {
        self.ensure_phase(DragPhase::Committing, DragPhase::Idle)?;
        self.reset();
        Ok(())
    }

    fn start(&mut self, item: ItemId, source: ColumnId, sensor: Sensor, origin: Point, rect: Rect) {
        let session = DragSession {
            id: Uuid::new_v4(),
            active_item: item,
            source_column: source,
            sensor,
            origin,
            initial_rect: rect,
            last_target: None,
        };
        tracing::debug!(
            session = %session.id,
            item = %session.active_item,
            column = %session.source_column,
            ?sensor,
            "drag started"
        );
        self.session = Some(session);
        self.phase = DragPhase::Dragging;
    }

    fn release(&mut self, board: &BoardState) -> DropOutcome {
        if self.phase != DragPhase::Dragging {
            return DropOutcome::Aborted;
        }
        let Some(session) = self.session.clone() else {
            self.reset();
            return DropOutcome::Aborted;
        };

        let outcome = match session.last_target.as_ref() {
            Some(target) => self.commit(board, &session, target),
            None => DropOutcome::Aborted,
        };

        if matches!(outcome, DropOutcome::Committed(_)) {
            self.phase = DragPhase::Committing;
        } else {
            tracing::debug!(session = %session.id, ?outcome, "drag ended without a move");
            self.reset();
        }
        outcome
    }

    fn commit(&self, board: &BoardState, session: &DragSession, target: &DropTarget) -> DropOutcome {
        let active = &session.active_item;
        let (Some(source), Some(dest)) = (
            board.find_container(active.as_str()).cloned(),
            board.find_container(target.as_str()).cloned(),
        ) else {
            tracing::debug!(session = %session.id, %active, ?target, "unresolvable drop");
            return DropOutcome::Aborted;
        };
        if source != session.source_column {
            tracing::debug!(
                session = %session.id,
                started = %session.source_column,
                now = %source,
                "item changed column during drag"
            );
        }

        let Some(from) = board.index_of(&source, active) else {
            return DropOutcome::Aborted;
        };
        let same_column = source == dest;
        let dest_len = board.items_in(&dest).len();
        let dest_index = match target {
            DropTarget::Item(over) => match board.index_of(&dest, over) {
                Some(index) => index,
                None => return DropOutcome::Aborted,
            },
            DropTarget::Column(_) if same_column => dest_len.saturating_sub(1),
            DropTarget::Column(_) => dest_len,
        };

        let mut next = match board.apply_move(&source, &dest, active, dest_index) {
            Ok(Some(next)) => next,
            Ok(None) => return DropOutcome::NoOp,
            Err(e) => {
                tracing::debug!(session = %session.id, error = %e, "move rejected");
                return DropOutcome::Aborted;
            }
        };

        match self.place(&mut next, &dest, active, dest_index, !same_column) {
            Ok(Placed {
                order,
                updates,
                respaced,
            }) => {
                let Some(original) = board.item(active).cloned() else {
                    return DropOutcome::Aborted;
                };
                tracing::debug!(
                    session = %session.id,
                    item = %active,
                    from = %source,
                    to = %dest,
                    index = dest_index,
                    order,
                    "move committed locally"
                );
                DropOutcome::Committed(Box::new(Commit {
                    state: next,
                    item_id: active.clone(),
                    source_column: source.clone(),
                    dest_column: dest.clone(),
                    dest_index,
                    order,
                    column_changed: !same_column,
                    updates,
                    undo: MoveUndo {
                        original,
                        source_column: source,
                        source_index: from,
                        applied_column: dest,
                        field: self.group_by.order_field(),
                        applied_order: order,
                        respaced,
                    },
                }))
            }
            Err(e) => {
                tracing::debug!(session = %session.id, error = %e, "order assignment failed");
                DropOutcome::Aborted
            }
        }
    }

    /// Writes the new order of the moved item into `next` and builds the
    /// remote updates
    fn place(
        &self,
        next: &mut BoardState,
        dest: &ColumnId,
        active: &ItemId,
        dest_index: usize,
        column_changed: bool,
    ) -> Result<Placed> {
        let field = self.group_by.order_field();
        let primary = self.group_by.is_primary();
        let new_column = (primary && column_changed).then(|| dest.clone());

        let moved_update = |order: f64| ItemUpdate {
            item_id: active.clone(),
            new_column: new_column.clone(),
            field,
            order,
            column_changed,
        };

        match self.assigner.order_for(next.items_in(dest), dest_index, field) {
            Ok(order) => {
                next.update_item(dest, active, |item| {
                    item.with_position(field, order, new_column.clone())
                })?;
                let updates = if primary { vec![moved_update(order)] } else { Vec::new() };
                Ok(Placed {
                    order,
                    updates,
                    respaced: Vec::new(),
                })
            }
            Err(BoardError::OrderSpaceExhausted { .. }) => {
                let previous: Vec<f64> = next
                    .items_in(dest)
                    .iter()
                    .map(|item| item.order_of(field))
                    .collect();
                let orders = self.assigner.rebalance(next.items_in(dest));
                tracing::debug!(column = %dest, items = orders.len(), "respacing column orders");

                let mut moved_order = 0.0;
                let mut siblings = Vec::new();
                let mut respaced = Vec::new();
                for ((id, order), previous) in orders.into_iter().zip(previous) {
                    if &id == active {
                        moved_order = order;
                        next.update_item(dest, &id, |item| {
                            item.with_position(field, order, new_column.clone())
                        })?;
                    } else {
                        next.update_item(dest, &id, |item| item.with_position(field, order, None))?;
                        respaced.push(RespacedOrder {
                            item_id: id.clone(),
                            previous,
                            applied: order,
                        });
                        siblings.push(ItemUpdate {
                            item_id: id,
                            new_column: None,
                            field,
                            order,
                            column_changed: false,
                        });
                    }
                }

                let updates = if primary {
                    let mut updates = vec![moved_update(moved_order)];
                    updates.extend(siblings);
                    updates
                } else {
                    Vec::new()
                };
                Ok(Placed {
                    order: moved_order,
                    updates,
                    respaced,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn ensure_phase(&self, expected: DragPhase, to: DragPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(BoardError::InvalidTransition {
                from: self.phase.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.session = None;
        self.armed = None;
    }
}
