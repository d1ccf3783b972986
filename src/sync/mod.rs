//! Remote reconciliation of locally committed moves.
//!
//! A committed move is already visible on the board when it reaches the
//! reconciler. [`SyncReconciler::dispatch`] writes it in the background and
//! reports the result on a channel; the board owner drains that channel and
//! rolls a failed move back.

use crate::{
    domain::{ColumnId, ItemId, MoveUndo, OrderField},
    error::{BoardError, Result},
    storage::{ItemPatch, ItemStore},
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Remote write for one item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub item_id: ItemId,
    /// Destination column, set only when the column changed
    pub new_column: Option<ColumnId>,
    pub field: OrderField,
    pub order: f64,
    pub column_changed: bool,
}

impl ItemUpdate {
    /// Builds the store patch; a column change stamps `status_updated_at`
    pub fn to_patch(&self) -> ItemPatch {
        let column_key = if self.column_changed {
            self.new_column.clone()
        } else {
            None
        };
        ItemPatch {
            status_updated_at: column_key.as_ref().map(|_| Utc::now()),
            column_key,
            field: self.field,
            order: self.order,
        }
    }
}

/// Something that caches query results and can be told they are stale
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, query_key: &str);
}

/// Generation counter per query key
///
/// Readers remember the generation they fetched at and refetch once
/// [`QueryCache::is_stale`] says so.
#[derive(Debug, Default)]
pub struct QueryCache {
    generations: Mutex<HashMap<String, u64>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self, query_key: &str) -> u64 {
        self.generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(query_key)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_stale(&self, query_key: &str, seen: u64) -> bool {
        self.generation(query_key) != seen
    }
}

impl CacheInvalidator for QueryCache {
    fn invalidate(&self, query_key: &str) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *generations.entry(query_key.to_string()).or_insert(0) += 1;
    }
}

/// A committed move waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTicket {
    pub id: Uuid,
    pub updates: Vec<ItemUpdate>,
    pub undo: MoveUndo,
}

impl SyncTicket {
    pub fn new(updates: Vec<ItemUpdate>, undo: MoveUndo) -> Self {
        Self {
            id: Uuid::new_v4(),
            updates,
            undo,
        }
    }
}

/// Outcome of a dispatched ticket
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Persisted { ticket: Uuid, item_id: ItemId },
    /// `applied` leading updates of the ticket were written before the error
    Failed {
        ticket: SyncTicket,
        applied: usize,
        error: String,
    },
}

/// Writes committed moves to the item store and invalidates cached lists
#[derive(Clone)]
pub struct SyncReconciler {
    store: Arc<dyn ItemStore>,
    cache: Arc<dyn CacheInvalidator>,
    query_key: String,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncReconciler {
    /// Creates a reconciler and the receiver its dispatch results go to
    pub fn new(
        store: Arc<dyn ItemStore>,
        cache: Arc<dyn CacheInvalidator>,
        query_key: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let reconciler = Self {
            store,
            cache,
            query_key: query_key.into(),
            events,
        };
        (reconciler, receiver)
    }

    pub fn query_key(&self) -> &str {
        &self.query_key
    }

    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Writes one update and invalidates the cached item list
    pub async fn persist(&self, update: &ItemUpdate) -> Result<()> {
        self.persist_all(std::slice::from_ref(update)).await
    }

    /// Writes updates in order, stopping at the first failure
    ///
    /// The cache is invalidated once, after the last write, unless nothing
    /// was written at all.
    pub async fn persist_all(&self, updates: &[ItemUpdate]) -> Result<()> {
        self.persist_counted(updates).await.1
    }

    /// Like [`persist_all`](Self::persist_all), also returning how many
    /// updates were written
    async fn persist_counted(&self, updates: &[ItemUpdate]) -> (usize, Result<()>) {
        let mut written = 0;
        let mut result = Ok(());
        for update in updates {
            if let Err(e) = self
                .store
                .update_one(&update.item_id, &update.to_patch())
                .await
            {
                result = Err(e);
                break;
            }
            written += 1;
        }

        match &result {
            Ok(()) => {
                self.cache.invalidate(&self.query_key);
                tracing::info!(
                    writes = written,
                    query_key = %self.query_key,
                    "move persisted"
                );
            }
            Err(_) if written > 0 => {
                // The store changed even though the move did not finish
                self.cache.invalidate(&self.query_key);
                tracing::warn!(
                    written,
                    of = updates.len(),
                    query_key = %self.query_key,
                    "move partially persisted"
                );
            }
            Err(_) => {}
        }
        (written, result)
    }

    /// Persists a ticket in the background
    ///
    /// Must be called from within a tokio runtime. The returned handle need
    /// not be awaited; the result arrives as a [`SyncEvent`].
    pub fn dispatch(&self, ticket: SyncTicket) -> Result<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BoardError::StorageError(format!("no async runtime: {e}")))?;
        let reconciler = self.clone();

        Ok(runtime.spawn(async move {
            let event = match reconciler.persist_counted(&ticket.updates).await {
                (_, Ok(())) => SyncEvent::Persisted {
                    ticket: ticket.id,
                    item_id: ticket.undo.original.id.clone(),
                },
                (applied, Err(e)) => {
                    tracing::warn!(
                        ticket = %ticket.id,
                        item = %ticket.undo.original.id,
                        applied,
                        "Failed to persist move: {e}"
                    );
                    SyncEvent::Failed {
                        ticket,
                        applied,
                        error: e.to_string(),
                    }
                }
            };
            // Receiver gone means the board was torn down
            let _ = reconciler.events.send(event);
        }))
    }
}
