//! HTTP client for the Tiffin hosted order service.
//!
//! Wraps the storefront order API behind the `RemoteOrderService` seam so
//! the offline queue never touches HTTP directly. Authentication is a
//! bearer token obtained out of band (the auth provider is not this
//! crate's concern).

mod client;
mod config;
mod error;

pub use client::OrderApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
