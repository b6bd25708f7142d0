//! Queue error types

use thiserror::Error;

/// Errors surfaced synchronously by queue operations
///
/// Submission and persistence failures are deliberately absent: the former
/// are observed through order state (`Failed` + `last_error`), the latter
/// are logged and degrade durability for the session without failing the
/// call.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Malformed call; the queue was not mutated
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
