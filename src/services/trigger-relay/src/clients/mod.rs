//! Remote collaborators of the dispatcher
//!
//! The dispatcher only sees these traits; [`StoreApiClient`] and
//! [`HttpRelayClient`] are the reqwest-backed implementations wired by the
//! service.

pub mod relay;
pub mod store_api;

pub use relay::HttpRelayClient;
pub use store_api::StoreApiClient;

use crate::error::{RelayError, StoreApiError};
use crate::models::{AppData, OutboundPayload, StoreId};
use async_trait::async_trait;
use serde_json::Value;

/// Reads the per-store application settings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppDataProvider: Send + Sync {
    async fn fetch_app_data(&self, store_id: StoreId) -> Result<AppData, StoreApiError>;
}

/// Fetches documents (`orders`, `carts`, `customers`, ...) from the store API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_resource(
        &self,
        store_id: StoreId,
        resource: &str,
        id: &str,
    ) -> Result<Value, StoreApiError>;
}

/// Delivers relay payloads to merchant webhooks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// POST the payload as JSON and return the remote status code
    async fn post_json(&self, url: &str, payload: &OutboundPayload) -> Result<u16, RelayError>;
}
