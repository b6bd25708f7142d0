//! Durable storage for the offline order queue
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `offline_queue` | namespace | JSON `Vec<PendingOrder>` | Full queue snapshot |
//!
//! The queue writes its complete contents on every mutation, keyed by a
//! fixed namespace, so a reload recovers the exact pending set. Storage is
//! mutated only through the queue's operations; nothing else writes here.
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap), so a crash between mutations leaves the last
//! committed snapshot intact.
//!
//! redb operations are synchronous for stability.

use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::order::PendingOrder;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for queue snapshots: key = namespace, value = JSON-serialized order list
const QUEUE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("offline_queue");

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable local storage seam for the queue
///
/// Synchronous by design: persistence happens inside the queue's mutation
/// critical section, before subscribers are notified.
pub trait QueueStore: Send + Sync {
    /// Load the persisted snapshot for a namespace, `None` if absent.
    fn load(&self, namespace: &str) -> StoreResult<Option<Vec<PendingOrder>>>;

    /// Replace the persisted snapshot for a namespace.
    fn save(&self, namespace: &str, orders: &[PendingOrder]) -> StoreResult<()>;

    /// Drop the persisted snapshot for a namespace entirely.
    fn clear(&self, namespace: &str) -> StoreResult<()>;
}

/// Queue storage backed by redb
#[derive(Clone)]
pub struct RedbQueueStore {
    db: Arc<Database>,
}

impl RedbQueueStore {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;

        // Create the table so first reads don't race table creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(QUEUE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(QUEUE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl QueueStore for RedbQueueStore {
    fn load(&self, namespace: &str) -> StoreResult<Option<Vec<PendingOrder>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(QUEUE_TABLE)?;

        let Some(raw) = table.get(namespace)? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Vec<PendingOrder>>(raw.value()) {
            Ok(orders) => Ok(Some(orders)),
            Err(e) => {
                // A corrupt snapshot must not wedge startup; the next save
                // overwrites it.
                tracing::warn!(
                    namespace = %namespace,
                    error = %e,
                    "Discarding unreadable queue snapshot"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, namespace: &str, orders: &[PendingOrder]) -> StoreResult<()> {
        let bytes = serde_json::to_vec(orders)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(QUEUE_TABLE)?;
            table.insert(namespace, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn clear(&self, namespace: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(QUEUE_TABLE)?;
            table.remove(namespace)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// In-process queue storage for tests and ephemeral hosts
#[derive(Default)]
pub struct MemoryQueueStore {
    snapshots: RwLock<HashMap<String, Vec<PendingOrder>>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryQueueStore {
    fn load(&self, namespace: &str) -> StoreResult<Option<Vec<PendingOrder>>> {
        Ok(self.snapshots.read().get(namespace).cloned())
    }

    fn save(&self, namespace: &str, orders: &[PendingOrder]) -> StoreResult<()> {
        self.snapshots
            .write()
            .insert(namespace.to_string(), orders.to_vec());
        Ok(())
    }

    fn clear(&self, namespace: &str) -> StoreResult<()> {
        self.snapshots.write().remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{SubmitMode, SyncState};

    fn sample_orders() -> Vec<PendingOrder> {
        let mut a = PendingOrder::new(
            serde_json::json!({"items": [{"sku": "pad-thai", "qty": 1}]}),
            SubmitMode::Create,
            None,
        );
        a.status = SyncState::Failed;
        a.attempts = 2;
        a.last_error = Some("network error: connection refused".into());

        let b = PendingOrder::new(
            serde_json::json!({"items": [{"sku": "laksa", "qty": 2}]}),
            SubmitMode::Edit,
            Some("ord_42".into()),
        );

        vec![a, b]
    }

    #[test]
    fn test_redb_save_and_load() {
        let store = RedbQueueStore::open_in_memory().unwrap();
        let orders = sample_orders();

        assert!(store.load("ns").unwrap().is_none());
        store.save("ns", &orders).unwrap();

        let loaded = store.load("ns").unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, orders[0].id);
        assert_eq!(loaded[0].status, SyncState::Failed);
        assert_eq!(loaded[0].attempts, 2);
        assert_eq!(loaded[1].target_order_id.as_deref(), Some("ord_42"));
    }

    #[test]
    fn test_redb_clear() {
        let store = RedbQueueStore::open_in_memory().unwrap();
        store.save("ns", &sample_orders()).unwrap();
        store.clear("ns").unwrap();
        assert!(store.load("ns").unwrap().is_none());
    }

    #[test]
    fn test_redb_namespaces_are_independent() {
        let store = RedbQueueStore::open_in_memory().unwrap();
        store.save("a", &sample_orders()).unwrap();
        store.save("b", &[]).unwrap();

        assert_eq!(store.load("a").unwrap().unwrap().len(), 2);
        assert_eq!(store.load("b").unwrap().unwrap().len(), 0);
        store.clear("a").unwrap();
        assert!(store.load("a").unwrap().is_none());
        assert!(store.load("b").unwrap().is_some());
    }

    #[test]
    fn test_redb_corrupt_snapshot_is_discarded() {
        let store = RedbQueueStore::open_in_memory().unwrap();

        let write_txn = store.db.begin_write().unwrap();
        {
            let mut table = write_txn.open_table(QUEUE_TABLE).unwrap();
            table.insert("ns", b"not json".as_slice()).unwrap();
        }
        write_txn.commit().unwrap();

        assert!(store.load("ns").unwrap().is_none());
    }

    #[test]
    fn test_redb_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.redb");
        let orders = sample_orders();

        {
            let store = RedbQueueStore::open(&path).unwrap();
            store.save("ns", &orders).unwrap();
        }

        let store = RedbQueueStore::open(&path).unwrap();
        let loaded = store.load("ns").unwrap().unwrap();
        assert_eq!(loaded.len(), orders.len());
        assert_eq!(loaded[0].id, orders[0].id);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryQueueStore::new();
        store.save("ns", &sample_orders()).unwrap();
        assert_eq!(store.load("ns").unwrap().unwrap().len(), 2);
        store.clear("ns").unwrap();
        assert!(store.load("ns").unwrap().is_none());
    }
}
