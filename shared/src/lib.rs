//! Shared types for the Tiffin offline order queue
//!
//! Contract types used across the queue engine and the order API client:
//! the pending-order model, the aggregate queue status, and the remote
//! order service seam.

pub mod order;
pub mod remote;
pub mod util;

// Re-exports
pub use order::{PendingOrder, QueueStatus, SubmitMode, SyncState};
pub use remote::{RemoteError, RemoteOrderService, RemoteResult};
pub use serde::{Deserialize, Serialize};
