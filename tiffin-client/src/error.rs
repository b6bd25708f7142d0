//! Client error types

use serde::de::DeserializeOwned;
use shared::remote::RemoteError;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                RemoteError::Network(e.to_string())
            }
            ClientError::Http(e) => RemoteError::Rejected(e.to_string()),
            other => RemoteError::Rejected(other.to_string()),
        }
    }
}

/// Map an error status code to a `ClientError`, draining the body for the
/// message.
async fn error_from_status(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status.as_u16() {
        401 => ClientError::Unauthorized,
        403 => ClientError::Forbidden(text),
        404 => ClientError::NotFound(text),
        400..=499 => ClientError::Validation(text),
        _ => ClientError::Internal(text),
    }
}

/// Decode a JSON response, mapping error statuses to `ClientError`.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> ClientResult<T> {
    if !resp.status().is_success() {
        return Err(error_from_status(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Check a response for success, discarding any body.
pub(crate) async fn handle_empty_response(resp: reqwest::Response) -> ClientResult<()> {
    if !resp.status().is_success() {
        return Err(error_from_status(resp).await);
    }
    Ok(())
}
