use std::path::PathBuf;

/// Queue configuration
///
/// # Environment variables
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/tiffin/storefront | Directory holding the queue database |
/// | QUEUE_NAMESPACE | offline_orders | Persistence key for this queue instance |
/// | SUBMIT_TIMEOUT_MS | 30000 | Upper bound on a single submission attempt |
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Directory holding the queue database file
    pub work_dir: String,
    /// Persistence namespace; lets several queues share one store
    pub namespace: String,
    /// Upper bound on a single submission attempt (milliseconds).
    /// A remote call that outlives this is recorded as failed instead of
    /// leaving the order syncing forever.
    pub submit_timeout_ms: u64,
}

impl QueueConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/tiffin/storefront".into()),
            namespace: std::env::var("QUEUE_NAMESPACE")
                .unwrap_or_else(|_| "offline_orders".into()),
            submit_timeout_ms: std::env::var("SUBMIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
        }
    }

    /// Override namespace and submission timeout, common in tests.
    pub fn with_overrides(namespace: impl Into<String>, submit_timeout_ms: u64) -> Self {
        let mut config = Self::from_env();
        config.namespace = namespace.into();
        config.submit_timeout_ms = submit_timeout_ms;
        config
    }

    /// Path of the redb database file inside the work directory.
    pub fn queue_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("offline_queue.redb")
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
