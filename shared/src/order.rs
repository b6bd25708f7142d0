//! Pending-order model and aggregate queue status
//!
//! A `PendingOrder` is a unit of work buffered while the hosted order
//! service is unreachable. Its local `id` is not the eventual remote order
//! id; the remote id only exists once a `Create` submission succeeds.

use crate::util;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a buffered order should reach the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitMode {
    /// New order, submitted via `submit_order`
    #[default]
    Create,
    /// Edit of an existing remote order, submitted via `update_order`
    Edit,
}

/// Lifecycle state of a buffered order
///
/// Transitions: `Pending → Syncing → {removed | Failed}`, and
/// `Failed → Syncing` on retry. Success removes the order outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Pending,
    Syncing,
    Failed,
}

/// A single order awaiting (or having failed) submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Locally generated id; stable across retries (idempotency key)
    pub id: String,
    /// Opaque order data, forwarded verbatim to the remote service
    pub payload: Value,
    pub mode: SubmitMode,
    /// Remote order to update; present only for `SubmitMode::Edit`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_order_id: Option<String>,
    pub status: SyncState,
    /// Submission attempts so far
    pub attempts: u32,
    /// UTC milliseconds at enqueue
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingOrder {
    /// Create a fresh pending order with a new local id.
    pub fn new(payload: Value, mode: SubmitMode, target_order_id: Option<String>) -> Self {
        Self {
            id: util::queue_id(),
            payload,
            mode,
            target_order_id,
            status: SyncState::Pending,
            attempts: 0,
            created_at: util::now_millis(),
            last_error: None,
        }
    }
}

/// Aggregate counts of buffered orders, the queue's observable summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
}

impl QueueStatus {
    /// Recompute the aggregate from the current order set.
    pub fn of(orders: &[PendingOrder]) -> Self {
        let mut status = Self::default();
        for order in orders {
            match order.status {
                SyncState::Pending => status.pending += 1,
                SyncState::Syncing => status.syncing += 1,
                SyncState::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Total buffered orders regardless of state.
    pub fn total(&self) -> usize {
        self.pending + self.syncing + self.failed
    }

    /// True while at least one submission is in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_in(status: SyncState) -> PendingOrder {
        let mut order = PendingOrder::new(serde_json::json!({"items": []}), SubmitMode::Create, None);
        order.status = status;
        order
    }

    #[test]
    fn test_status_counts() {
        let orders = vec![
            order_in(SyncState::Pending),
            order_in(SyncState::Pending),
            order_in(SyncState::Syncing),
            order_in(SyncState::Failed),
        ];

        let status = QueueStatus::of(&orders);
        assert_eq!(status.pending, 2);
        assert_eq!(status.syncing, 1);
        assert_eq!(status.failed, 1);
        assert_eq!(status.total(), 4);
        assert!(status.is_syncing());
    }

    #[test]
    fn test_empty_status() {
        let status = QueueStatus::of(&[]);
        assert_eq!(status, QueueStatus::default());
        assert!(!status.is_syncing());
    }

    #[test]
    fn test_new_order_defaults() {
        let order = PendingOrder::new(serde_json::json!({"total": 12.5}), SubmitMode::Create, None);
        assert_eq!(order.status, SyncState::Pending);
        assert_eq!(order.attempts, 0);
        assert!(order.last_error.is_none());
        assert!(!order.id.is_empty());
    }
}
