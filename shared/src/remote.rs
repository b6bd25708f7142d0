//! Remote order service seam
//!
//! The queue never talks HTTP directly; it drives this trait. The hosted
//! order API client implements it, and tests substitute scripted doubles.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Submission failure as seen by the queue
///
/// The queue treats every rejection identically (the message becomes the
/// order's `last_error`); the split exists so callers can log transport
/// trouble apart from server-side rejections.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport-level failure: connect, timeout, TLS
    #[error("network error: {0}")]
    Network(String),

    /// The service answered and said no: validation, auth, conflict
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Result type for remote submissions
pub type RemoteResult<T> = Result<T, RemoteError>;

/// The hosted order service, reduced to the two calls the queue needs
#[async_trait]
pub trait RemoteOrderService: Send + Sync {
    /// Create a new remote order from the payload. Returns the remote
    /// order id assigned by the service.
    ///
    /// `idempotency_key` is the stable local queue id; the service uses it
    /// to deduplicate retries after a false-negative network error.
    async fn submit_order(&self, payload: &Value, idempotency_key: &str) -> RemoteResult<String>;

    /// Replace an existing remote order's data with the payload.
    async fn update_order(
        &self,
        target_order_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> RemoteResult<()>;
}
