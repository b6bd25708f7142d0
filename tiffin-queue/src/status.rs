//! QueueHandle — reactive queue view for UI code
//!
//! Bridges the queue's status subscription into plain observable state
//! (current `QueueStatus`, pending-order list, an `is_syncing` flag) and
//! forwards the queue operations, so view code never touches persistence
//! or subscription plumbing.

use crate::queue::{OfflineQueue, QueueResult};
use parking_lot::RwLock;
use shared::order::{PendingOrder, QueueStatus, SubmitMode};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Host-facing handle over an [`OfflineQueue`]
///
/// `attach` spawns a mirror task that follows status updates; dropping the
/// handle (or calling [`detach`](Self::detach)) cancels it, so no listener
/// outlives the view that created it.
pub struct QueueHandle {
    queue: Arc<OfflineQueue>,
    status: Arc<RwLock<QueueStatus>>,
    orders: Arc<RwLock<Vec<PendingOrder>>>,
    shutdown: CancellationToken,
}

impl QueueHandle {
    /// Subscribe to the queue and start mirroring its state.
    pub fn attach(queue: Arc<OfflineQueue>) -> Self {
        let status = Arc::new(RwLock::new(queue.status()));
        let orders = Arc::new(RwLock::new(queue.pending_orders()));
        let shutdown = CancellationToken::new();

        let mut rx = queue.subscribe();
        let mirror_queue = queue.clone();
        let mirror_status = status.clone();
        let mirror_orders = orders.clone();
        let token = shutdown.clone();

        tokio::spawn(async move {
            tracing::debug!("Queue handle attached");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,

                    result = rx.recv() => match result {
                        Ok(update) => {
                            *mirror_status.write() = update;
                            *mirror_orders.write() = mirror_queue.pending_orders();
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Missed updates carry no information we cannot
                            // recover from a fresh snapshot.
                            tracing::warn!(missed = n, "Queue handle lagged, resyncing");
                            *mirror_status.write() = mirror_queue.status();
                            *mirror_orders.write() = mirror_queue.pending_orders();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Queue handle detached");
        });

        Self {
            queue,
            status,
            orders,
            shutdown,
        }
    }

    /// Latest mirrored aggregate status.
    pub fn status(&self) -> QueueStatus {
        *self.status.read()
    }

    /// True while at least one submission is in flight.
    pub fn is_syncing(&self) -> bool {
        self.status().is_syncing()
    }

    /// Latest mirrored pending-order list.
    pub fn pending_orders(&self) -> Vec<PendingOrder> {
        self.orders.read().clone()
    }

    /// Buffer an order for submission. Forwards to the queue.
    pub fn add_order(
        &self,
        payload: serde_json::Value,
        mode: SubmitMode,
        target_order_id: Option<String>,
    ) -> QueueResult<String> {
        self.queue.add_to_queue(payload, mode, target_order_id)
    }

    /// Re-attempt every failed order. Forwards to the queue.
    pub fn retry_failed(&self) {
        self.queue.retry_failed();
    }

    /// Empty the queue and its persisted storage. Forwards to the queue.
    pub fn clear_queue(&self) {
        self.queue.clear_queue();
    }

    /// Delete one order. Forwards to the queue.
    pub fn remove_order(&self, id: &str) {
        self.queue.remove_from_queue(id);
    }

    /// Stop mirroring. Idempotent; also runs on drop.
    pub fn detach(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for QueueHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
