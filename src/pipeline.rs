//! The board as a host page owns it.
//!
//! [`PipelineBoard`] holds the one authoritative [`BoardState`] and wires
//! the drag controller to it: a release that commits replaces the state
//! right away and hands the remote write to the [`SyncReconciler`] without
//! waiting for it. Failed writes come back through [`PipelineBoard::poll_sync`],
//! which undoes whatever the store did not receive and returns a
//! notification for the user.

use crate::config::EngineConfig;
use crate::dnd::{Direction, DragController, DragPhase, DropOutcome, DropTarget, Droppable};
use crate::dnd::{Point, Rect};
use crate::domain::{BoardConfig, BoardState, Column, ColumnId, GroupBy, Item, ItemId, MoveUndo};
use crate::error::Result;
use crate::storage::ItemStore;
use crate::sync::{CacheInvalidator, SyncEvent, SyncReconciler, SyncTicket};
use crate::view::{self, ColumnView};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// User-facing message about a move that could not be saved
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub item_id: ItemId,
    pub message: String,
    /// Whether the board was put back to its pre-move layout
    pub rolled_back: bool,
}

/// Summary of a move applied to the board
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSummary {
    pub item_id: ItemId,
    pub source_column: ColumnId,
    pub dest_column: ColumnId,
    pub dest_index: usize,
    pub order: f64,
    pub column_changed: bool,
    /// A remote write was dispatched for it
    pub dispatched: bool,
}

/// What a release did
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    Clicked(ItemId),
    Aborted,
    NoOp,
    Moved(MoveSummary),
}

pub struct PipelineBoard {
    columns: Vec<Column>,
    group_by: GroupBy,
    config: EngineConfig,
    state: BoardState,
    drag: DragController,
    sync: Option<SyncReconciler>,
    events: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    in_flight: Vec<JoinHandle<()>>,
    pending: Vec<Notification>,
}

impl PipelineBoard {
    /// Creates an empty board from its configuration
    pub fn new(board: BoardConfig) -> Result<Self> {
        board.engine.validate()?;
        let state = BoardState::from_grouping(Vec::new(), &board.columns, &board.group_by);
        let drag = DragController::new(&board.engine, board.group_by.clone());

        Ok(Self {
            columns: board.columns,
            group_by: board.group_by,
            config: board.engine,
            state,
            drag,
            sync: None,
            events: None,
            in_flight: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// Writes committed moves to `store`, invalidating `cache` on success
    pub fn connect(mut self, store: Arc<dyn ItemStore>, cache: Arc<dyn CacheInvalidator>) -> Self {
        let (reconciler, events) = SyncReconciler::new(store, cache, self.config.query_key.clone());
        self.sync = Some(reconciler);
        self.events = Some(events);
        self
    }

    /// Rebuilds the board from fresh source data
    ///
    /// Call this whenever the item list or the column set changes; nothing
    /// rebuilds implicitly.
    pub fn rebuild_from(&mut self, items: Vec<Item>, columns: Vec<Column>) {
        self.state = BoardState::from_grouping(items, &columns, &self.group_by);
        self.columns = columns;
        tracing::debug!(
            items = self.state.len(),
            columns = self.columns.len(),
            "board rebuilt"
        );
    }

    /// Refetches items from the connected store and rebuilds
    pub async fn refetch(&mut self) -> Result<()> {
        let Some(sync) = self.sync.as_ref() else {
            return Ok(());
        };
        let items = sync.store().list_items().await?;
        let columns = self.columns.clone();
        self.rebuild_from(items, columns);
        Ok(())
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn current_target(&self) -> Option<&DropTarget> {
        self.drag.current_target()
    }

    /// Columns to render, with the hovered column highlighted
    pub fn column_views(&self) -> Vec<ColumnView<'_>> {
        let over = self
            .drag
            .current_target()
            .and_then(|target| self.state.find_container(target.as_str()));
        view::column_views(&self.state, &self.columns, &self.config, over)
    }

    /// The item shown under the pointer while dragging
    pub fn overlay(&self) -> Option<&Item> {
        self.drag.overlay_item(&self.state)
    }

    pub fn pointer_down(&mut self, item: ItemId, origin: Point, rect: Rect) -> Result<()> {
        self.drag.pointer_down(item, origin, rect)
    }

    pub fn pointer_move(&mut self, point: Point, candidates: &[Droppable]) -> Option<DropTarget> {
        self.drag.pointer_move(point, candidates, &self.state).cloned()
    }

    pub fn pointer_up(&mut self) -> Release {
        let outcome = self.drag.pointer_up(&self.state);
        self.finish(outcome)
    }

    pub fn keyboard_pick_up(&mut self, item: ItemId) -> Result<()> {
        self.drag.keyboard_pick_up(item, &self.state)
    }

    pub fn keyboard_move(&mut self, direction: Direction) -> Option<DropTarget> {
        self.drag.keyboard_move(direction, &self.state).cloned()
    }

    pub fn keyboard_drop(&mut self) -> Release {
        let outcome = self.drag.keyboard_drop(&self.state);
        self.finish(outcome)
    }

    pub fn cancel(&mut self) -> bool {
        self.drag.cancel()
    }

    /// Applies finished remote writes; returns notifications for failures
    pub fn poll_sync(&mut self) -> Vec<Notification> {
        self.in_flight.retain(|handle| !handle.is_finished());

        let mut events = Vec::new();
        if let Some(receiver) = self.events.as_mut() {
            while let Ok(event) = receiver.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            self.apply_sync_event(event);
        }

        std::mem::take(&mut self.pending)
    }

    /// Waits for every dispatched write, then behaves like [`poll_sync`](Self::poll_sync)
    pub async fn flush_sync(&mut self) -> Vec<Notification> {
        for handle in std::mem::take(&mut self.in_flight) {
            if let Err(e) = handle.await {
                tracing::warn!("Sync task ended abnormally: {e}");
            }
        }
        self.poll_sync()
    }

    fn finish(&mut self, outcome: DropOutcome) -> Release {
        let commit = match outcome {
            DropOutcome::Clicked(item) => return Release::Clicked(item),
            DropOutcome::Aborted => return Release::Aborted,
            DropOutcome::NoOp => return Release::NoOp,
            DropOutcome::Committed(commit) => *commit,
        };

        self.state = commit.state;
        let mut summary = MoveSummary {
            item_id: commit.item_id,
            source_column: commit.source_column,
            dest_column: commit.dest_column,
            dest_index: commit.dest_index,
            order: commit.order,
            column_changed: commit.column_changed,
            dispatched: false,
        };

        if let (Some(sync), false) = (self.sync.as_ref(), commit.updates.is_empty()) {
            let ticket = SyncTicket::new(commit.updates, commit.undo);
            let undo = ticket.undo.clone();
            match sync.dispatch(ticket) {
                Ok(handle) => {
                    self.in_flight.push(handle);
                    summary.dispatched = true;
                }
                Err(e) => {
                    tracing::warn!(item = %summary.item_id, "Failed to dispatch move: {e}");
                    self.roll_back(&undo, 0, e.to_string());
                }
            }
        }

        if let Err(e) = self.drag.settle() {
            tracing::warn!("Drag controller out of step: {e}");
        }
        Release::Moved(summary)
    }

    fn apply_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Persisted { ticket, item_id } => {
                tracing::debug!(%ticket, item = %item_id, "move confirmed");
            }
            SyncEvent::Failed {
                ticket,
                applied,
                error,
            } => self.roll_back(&ticket.undo, applied, error),
        }
    }

    /// Undoes the part of a move the store never received
    ///
    /// With nothing written the whole move is undone. Once the moved item's
    /// own write landed it stays, and only respaced siblings whose writes
    /// were not sent get their previous orders back.
    fn roll_back(&mut self, undo: &MoveUndo, applied: usize, error: String) {
        let item_id = undo.original.id.clone();
        let rolled_back = if applied == 0 {
            match self.state.restore(undo) {
                Some(restored) => {
                    self.state = restored;
                    true
                }
                None => {
                    tracing::warn!(item = %item_id, "Could not roll back move, item has moved since");
                    false
                }
            }
        } else {
            if let Some(restored) = self.state.restore_respaced(undo, applied - 1) {
                self.state = restored;
            }
            false
        };
        self.pending.push(Notification {
            message: format!("Failed to move {item_id}: {error}"),
            item_id,
            rolled_back,
        });
    }
}
