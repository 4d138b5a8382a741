//! # Trigger Relay Service
//!
//! Receives store trigger notifications, decides whether they matter to the
//! merchant and relays an enriched payload to the merchant's webhook.
//!
//! ## Flow
//!
//! 1. Read the store's app settings from the store API
//! 2. Filter: skip ignored resources, pass through anything that is not an
//!    order or cart change, or when no relay URL is configured
//! 3. Enrich: fetch the order or cart, hold back young carts, drop order
//!    changes that touch neither payment nor fulfillment, attach the cart
//!    customer
//! 4. Relay: POST `{ storeId, trigger, order|cart, customer? }` to the
//!    merchant webhook; delivery failures are logged, never returned
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trigger_relay_service::{RelayServiceConfig, TriggerRelayService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayServiceConfig::from_env()?;
//!     let service = TriggerRelayService::new(config)?;
//!     service.start().await?;
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod service;

// Re-export main types for easier usage
pub use clients::{AppDataProvider, HttpRelayClient, RelayClient, ResourceFetcher, StoreApiClient};
pub use config::RelayServiceConfig;
pub use dispatcher::{DispatchOutcome, Echo, TriggerDispatcher};
pub use error::{RelayError, ServiceError, ServiceResult, StoreApiError};
pub use handlers::{create_routes, probe_routes, webhook_routes, AppState, STORE_ID_HEADER};
pub use models::{AppData, OutboundPayload, RemoteResource, ResourceKind, StoreId, Trigger};
pub use service::TriggerRelayService;

/// Version information for the relay service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVICE_NAME: &str = "trigger-relay";

/// Health check information
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    pub service: String,
    pub version: String,
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            version: VERSION.to_string(),
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(SERVICE_NAME, "trigger-relay");
    }

    #[test]
    fn test_health_status() {
        let health = HealthStatus::healthy();
        assert_eq!(health.service, "trigger-relay");
        assert_eq!(health.status, "healthy");
    }
}
