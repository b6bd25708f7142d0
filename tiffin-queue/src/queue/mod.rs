//! OfflineQueue — durable buffer for orders placed while offline
//!
//! # Submission flow
//!
//! ```text
//! add_to_queue(payload, mode, target)
//!     ├─ 1. Validate mode/target pairing
//!     ├─ 2. Persist order as Pending, notify subscribers
//!     ├─ 3. Spawn submission task, return local id
//!     └─ (async) submit_one
//!         ├─ 4. Mark Syncing, count attempt, persist, notify
//!         ├─ 5. Call remote service (bounded by submit timeout)
//!         ├─ 6a. Success: remove order, persist, notify
//!         └─ 6b. Failure: mark Failed + last_error, persist, notify
//! ```
//!
//! Failures never auto-retry. Re-attempts come from `retry_failed` or the
//! host's `on_connectivity_restored` signal, so an extended offline period
//! cannot turn into a background retry storm.
//!
//! On construction the queue loads its persisted namespace but does not
//! resubmit anything; a restart immediately after reconnect therefore never
//! triggers a thundering herd on the order service.

mod error;
pub use error::{QueueError, QueueResult};

#[cfg(test)]
mod tests;

use crate::config::QueueConfig;
use crate::storage::QueueStore;
use dashmap::DashSet;
use parking_lot::Mutex;
use serde_json::Value;
use shared::order::{PendingOrder, QueueStatus, SubmitMode, SyncState};
use shared::remote::{RemoteError, RemoteOrderService};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;

/// Status broadcast channel capacity
const STATUS_CHANNEL_CAPACITY: usize = 256;

/// Durable offline order queue
///
/// Constructed with injected storage and remote-service collaborators and
/// owned by the application's composition root; there is no global
/// instance. All state mutations are atomic under one lock and follow the
/// single write path: mutate → persist → notify.
pub struct OfflineQueue {
    namespace: String,
    submit_timeout: Duration,
    store: Arc<dyn QueueStore>,
    remote: Arc<dyn RemoteOrderService>,
    /// Buffered orders in insertion order
    orders: Mutex<Vec<PendingOrder>>,
    /// Ids with a live submission task; guards against duplicate
    /// concurrent submissions of the same order
    in_flight: DashSet<String>,
    status_tx: broadcast::Sender<QueueStatus>,
    /// Self-reference for spawning submission tasks from `&self` methods
    this: Weak<OfflineQueue>,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("namespace", &self.namespace)
            .field("status", &self.status())
            .finish()
    }
}

impl OfflineQueue {
    /// Create a queue over the given storage and remote service.
    ///
    /// Loads any previously persisted orders for the configured namespace
    /// verbatim — statuses included — and waits for an explicit
    /// `retry_failed` or `on_connectivity_restored` before resubmitting.
    pub fn new(
        store: Arc<dyn QueueStore>,
        remote: Arc<dyn RemoteOrderService>,
        config: QueueConfig,
    ) -> Arc<Self> {
        let loaded = match store.load(&config.namespace) {
            Ok(Some(orders)) => {
                tracing::info!(
                    count = orders.len(),
                    namespace = %config.namespace,
                    "Recovered persisted offline orders"
                );
                orders
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    namespace = %config.namespace,
                    error = %e,
                    "Failed to load persisted queue, starting empty"
                );
                Vec::new()
            }
        };

        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        Arc::new_cyclic(|this| Self {
            namespace: config.namespace,
            submit_timeout: Duration::from_millis(config.submit_timeout_ms),
            store,
            remote,
            orders: Mutex::new(loaded),
            in_flight: DashSet::new(),
            status_tx,
            this: this.clone(),
        })
    }

    /// Buffer an order and start submitting it asynchronously.
    ///
    /// Returns the local queue id immediately; the id also serves as the
    /// idempotency key for every submission attempt of this order.
    pub fn add_to_queue(
        &self,
        payload: Value,
        mode: SubmitMode,
        target_order_id: Option<String>,
    ) -> QueueResult<String> {
        match mode {
            SubmitMode::Edit => {
                if target_order_id.as_deref().is_none_or(str::is_empty) {
                    return Err(QueueError::InvalidArgument(
                        "edit mode requires a target order id".into(),
                    ));
                }
            }
            SubmitMode::Create => {
                if target_order_id.is_some() {
                    return Err(QueueError::InvalidArgument(
                        "create mode must not carry a target order id".into(),
                    ));
                }
            }
        }

        let order = PendingOrder::new(payload, mode, target_order_id);
        let id = order.id.clone();
        tracing::info!(order_id = %id, mode = ?mode, "Order buffered for submission");

        self.mutate(|orders| orders.push(order));
        self.spawn_submission(id.clone());
        Ok(id)
    }

    /// Re-attempt every failed order, in insertion order.
    ///
    /// Each order transitions to `Syncing` before its submission task is
    /// spawned; submissions are independent network calls with no
    /// cross-order ordering guarantee. No-op when nothing is failed.
    pub fn retry_failed(&self) {
        let ids: Vec<String> = {
            let orders = self.orders.lock();
            orders
                .iter()
                .filter(|o| o.status == SyncState::Failed)
                .map(|o| o.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return;
        }

        tracing::info!(count = ids.len(), "Retrying failed orders");
        self.mutate(|orders| {
            for order in orders.iter_mut() {
                if order.status == SyncState::Failed {
                    order.status = SyncState::Syncing;
                }
            }
        });

        for id in ids {
            self.spawn_submission(id);
        }
    }

    /// Host signal that connectivity came back.
    ///
    /// Re-attempts every order without a live submission task: failed
    /// orders, pending orders recovered from a previous session, and
    /// syncing orders orphaned by a crash (the in-flight set is empty
    /// after a restart). The queue never watches the platform itself.
    pub fn on_connectivity_restored(&self) {
        let ids: Vec<String> = {
            let orders = self.orders.lock();
            orders
                .iter()
                .filter(|o| !self.in_flight.contains(&o.id))
                .map(|o| o.id.clone())
                .collect()
        };
        if ids.is_empty() {
            return;
        }

        tracing::info!(count = ids.len(), "Connectivity restored, resubmitting buffered orders");
        for id in ids {
            self.spawn_submission(id);
        }
    }

    /// Delete an order unconditionally; no-op if the id is absent.
    ///
    /// Used after confirmed external resolution or explicit user
    /// dismissal.
    pub fn remove_from_queue(&self, id: &str) {
        if !self.orders.lock().iter().any(|o| o.id == id) {
            return;
        }
        tracing::info!(order_id = %id, "Order removed from queue");
        self.mutate(|orders| orders.retain(|o| o.id != id));
    }

    /// Empty the queue and its persisted storage. Destructive resets only;
    /// never called automatically.
    pub fn clear_queue(&self) {
        let mut orders = self.orders.lock();
        orders.clear();
        if let Err(e) = self.store.clear(&self.namespace) {
            tracing::warn!(namespace = %self.namespace, error = %e, "Failed to clear persisted queue");
        }
        drop(orders);

        tracing::info!("Offline queue cleared");
        let _ = self.status_tx.send(QueueStatus::default());
    }

    /// Read-only snapshot of buffered orders, in insertion order.
    pub fn pending_orders(&self) -> Vec<PendingOrder> {
        self.orders.lock().clone()
    }

    /// Current aggregate status.
    pub fn status(&self) -> QueueStatus {
        QueueStatus::of(&self.orders.lock())
    }

    /// Subscribe to aggregate status updates.
    ///
    /// Every subscriber receives every update; dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueStatus> {
        self.status_tx.subscribe()
    }

    // ------------------------------------------------------------------
    // Internal: mutation and submission
    // ------------------------------------------------------------------

    /// The sole write path: mutate under the lock, persist, then notify.
    ///
    /// A persist failure is logged and the queue keeps serving from memory
    /// for the session (degraded durability, never a crash).
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<PendingOrder>) -> R) -> R {
        let mut orders = self.orders.lock();
        let result = f(&mut orders);

        if let Err(e) = self.store.save(&self.namespace, &orders) {
            tracing::warn!(namespace = %self.namespace, error = %e, "Failed to persist queue");
        }
        let status = QueueStatus::of(&orders);
        drop(orders);

        let _ = self.status_tx.send(status);
        result
    }

    /// Spawn a submission task for the order, unless one is already live.
    fn spawn_submission(&self, id: String) {
        let Some(queue) = self.this.upgrade() else {
            return;
        };
        if !self.in_flight.insert(id.clone()) {
            return;
        }

        tokio::spawn(async move {
            queue.submit_one(&id).await;
        });
    }

    /// Run one submission attempt to completion.
    ///
    /// Failures of one order never affect others: each attempt settles its
    /// own order and nothing else.
    async fn submit_one(&self, id: &str) {
        let Some((payload, mode, target, attempt)) = self.begin_attempt(id) else {
            // Removed (or cleared) before the task ran.
            self.in_flight.remove(id);
            return;
        };

        let submission = async {
            match mode {
                SubmitMode::Create => self
                    .remote
                    .submit_order(&payload, id)
                    .await
                    .map(Some),
                SubmitMode::Edit => match target.as_deref() {
                    Some(t) if !t.is_empty() => {
                        self.remote.update_order(t, &payload, id).await.map(|_| None)
                    }
                    _ => Err(RemoteError::Rejected("missing target order id".into())),
                },
            }
        };

        let outcome = match tokio::time::timeout(self.submit_timeout, submission).await {
            Ok(Ok(remote_id)) => Ok(remote_id),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "submission timed out after {}ms",
                self.submit_timeout.as_millis()
            )),
        };

        // Clear the in-flight mark before recording the outcome, so a retry
        // issued the moment `Failed` becomes visible can always start a
        // fresh task.
        self.in_flight.remove(id);

        match outcome {
            Ok(remote_id) => {
                tracing::info!(
                    order_id = %id,
                    remote_order_id = ?remote_id,
                    attempt,
                    "Order submitted"
                );
                self.mutate(|orders| orders.retain(|o| o.id != id));
            }
            Err(error) => {
                tracing::warn!(order_id = %id, attempt, error = %error, "Order submission failed");
                self.mutate(|orders| {
                    if let Some(order) = orders.iter_mut().find(|o| o.id == id) {
                        order.status = SyncState::Failed;
                        order.last_error = Some(error);
                    }
                });
            }
        }
    }

    /// Transition an order into `Syncing`, count the attempt, persist and
    /// notify. Returns what the submission needs, or `None` if the order
    /// disappeared in the meantime.
    fn begin_attempt(&self, id: &str) -> Option<(Value, SubmitMode, Option<String>, u32)> {
        let mut orders = self.orders.lock();
        let order = orders.iter_mut().find(|o| o.id == id)?;

        order.status = SyncState::Syncing;
        order.attempts += 1;
        let snapshot = (
            order.payload.clone(),
            order.mode,
            order.target_order_id.clone(),
            order.attempts,
        );

        if let Err(e) = self.store.save(&self.namespace, &orders) {
            tracing::warn!(namespace = %self.namespace, error = %e, "Failed to persist queue");
        }
        let status = QueueStatus::of(&orders);
        drop(orders);

        let _ = self.status_tx.send(status);
        Some(snapshot)
    }
}
