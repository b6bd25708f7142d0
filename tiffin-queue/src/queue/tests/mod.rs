use super::*;
use crate::storage::MemoryQueueStore;
use async_trait::async_trait;
use shared::remote::RemoteResult;
use std::sync::atomic::{AtomicBool, Ordering};

/// Scriptable remote service double.
///
/// Rejects everything while `reject_all` is set, or any payload carrying
/// `"reject": true`. Successful calls record their idempotency keys.
#[derive(Default)]
pub(super) struct ScriptedRemote {
    reject_all: AtomicBool,
    pub submitted: Mutex<Vec<String>>,
    pub updated: Mutex<Vec<(String, String)>>,
}

impl ScriptedRemote {
    fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn rejecting() -> Arc<Self> {
        let remote = Self::default();
        remote.reject_all.store(true, Ordering::SeqCst);
        Arc::new(remote)
    }

    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    fn should_reject(&self, payload: &Value) -> bool {
        self.reject_all.load(Ordering::SeqCst)
            || payload
                .get("reject")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

#[async_trait]
impl RemoteOrderService for ScriptedRemote {
    async fn submit_order(&self, payload: &Value, idempotency_key: &str) -> RemoteResult<String> {
        if self.should_reject(payload) {
            return Err(RemoteError::Rejected("order service rejected the payload".into()));
        }
        self.submitted.lock().push(idempotency_key.to_string());
        Ok(format!("remote-{idempotency_key}"))
    }

    async fn update_order(
        &self,
        target_order_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> RemoteResult<()> {
        if self.should_reject(payload) {
            return Err(RemoteError::Rejected("order service rejected the edit".into()));
        }
        self.updated
            .lock()
            .push((target_order_id.to_string(), idempotency_key.to_string()));
        Ok(())
    }
}

/// Remote whose calls never resolve; exercises the submission timeout.
pub(super) struct HangingRemote;

#[async_trait]
impl RemoteOrderService for HangingRemote {
    async fn submit_order(&self, _payload: &Value, _key: &str) -> RemoteResult<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(RemoteError::Network("unreachable".into()))
    }

    async fn update_order(&self, _target: &str, _payload: &Value, _key: &str) -> RemoteResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(RemoteError::Network("unreachable".into()))
    }
}

const TEST_NAMESPACE: &str = "test_orders";

fn test_config() -> QueueConfig {
    QueueConfig::with_overrides(TEST_NAMESPACE, 1_000)
}

fn create_test_queue(remote: Arc<dyn RemoteOrderService>) -> Arc<OfflineQueue> {
    OfflineQueue::new(Arc::new(MemoryQueueStore::new()), remote, test_config())
}

fn create_test_queue_with_store(
    store: Arc<MemoryQueueStore>,
    remote: Arc<dyn RemoteOrderService>,
) -> Arc<OfflineQueue> {
    OfflineQueue::new(store, remote, test_config())
}

fn order_payload(name: &str) -> Value {
    serde_json::json!({
        "customer": name,
        "items": [{"sku": "green-curry", "qty": 1}],
        "total": 11.9
    })
}

/// Build a persisted order in a given state, for seeding stores.
fn seeded_order(status: SyncState, payload: Value) -> PendingOrder {
    let mut order = PendingOrder::new(payload, SubmitMode::Create, None);
    order.status = status;
    if status == SyncState::Failed {
        order.attempts = 1;
        order.last_error = Some("network error: connection refused".into());
    }
    order
}

/// Await status updates until `pred` matches, failing the test after 5s.
async fn wait_for(
    rx: &mut broadcast::Receiver<QueueStatus>,
    pred: impl Fn(QueueStatus) -> bool,
) -> QueueStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(status) if pred(status) => return status,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("status channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for queue status")
}
