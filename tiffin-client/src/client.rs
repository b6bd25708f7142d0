//! Order API client
//!
//! Thin wrapper over the hosted order endpoints:
//!
//! - `POST /api/orders` — create an order, returns the remote order id
//! - `PUT  /api/orders/{id}` — replace an existing order's data
//!
//! Every request carries the caller's idempotency key so the service can
//! deduplicate retries of the same queued order.

use crate::config::ClientConfig;
use crate::error::{handle_empty_response, handle_response, ClientError, ClientResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use shared::remote::{RemoteError, RemoteOrderService, RemoteResult};
use std::time::Duration;

const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Response body of a successful order creation
#[derive(Debug, Deserialize)]
struct SubmitOrderResponse {
    order_id: String,
}

/// HTTP client for the hosted order service
#[derive(Debug, Clone)]
pub struct OrderApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OrderApiClient {
    /// Build a client from the given configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self { http, config })
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    /// Create a new remote order. Returns the service-assigned order id.
    pub async fn create_order(
        &self,
        payload: &Value,
        idempotency_key: &str,
    ) -> ClientResult<String> {
        let url = format!("{}/api/orders", self.config.base_url);
        let resp = self
            .authorize(self.http.post(&url))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(payload)
            .send()
            .await?;

        let data: SubmitOrderResponse = handle_response(resp).await?;
        tracing::debug!(remote_order_id = %data.order_id, "Order created remotely");
        Ok(data.order_id)
    }

    /// Replace an existing remote order's data.
    pub async fn replace_order(
        &self,
        order_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> ClientResult<()> {
        if order_id.is_empty() {
            return Err(ClientError::Validation("empty order id".into()));
        }

        let url = format!("{}/api/orders/{order_id}", self.config.base_url);
        let resp = self
            .authorize(self.http.put(&url))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(payload)
            .send()
            .await?;

        handle_empty_response(resp).await?;
        tracing::debug!(remote_order_id = %order_id, "Order updated remotely");
        Ok(())
    }
}

#[async_trait]
impl RemoteOrderService for OrderApiClient {
    async fn submit_order(&self, payload: &Value, idempotency_key: &str) -> RemoteResult<String> {
        self.create_order(payload, idempotency_key)
            .await
            .map_err(RemoteError::from)
    }

    async fn update_order(
        &self,
        target_order_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> RemoteResult<()> {
        self.replace_order(target_order_id, payload, idempotency_key)
            .await
            .map_err(RemoteError::from)
    }
}
