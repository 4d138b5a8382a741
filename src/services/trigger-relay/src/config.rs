//! Configuration module for the trigger relay service
//!
//! Settings are layered with the `config` crate: built-in defaults, an optional
//! file named by `TRIGGER_RELAY_CONFIG_FILE`, then `TRIGGER_RELAY__*`
//! environment variables (double underscore separates nested keys).

use serde::{Deserialize, Serialize};
use url::Url;

/// Main configuration structure for the relay service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayServiceConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Store REST API used for app data and resource lookups
    pub store_api: StoreApiConfig,
    /// Outbound webhook client settings
    pub relay: RelayClientConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Route receiving store triggers (default: /ecom/webhook)
    pub webhook_path: String,
    /// Timeout in seconds for health and metrics requests (default: 30).
    /// The webhook route is bounded by the client timeouts instead.
    pub request_timeout: u64,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
}

/// Store API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreApiConfig {
    /// Base URL of the store REST API
    pub base_url: String,
    /// Application id whose data holds the per-store settings
    pub application_id: String,
    /// Authentication id sent as `X-My-ID`
    pub my_id: Option<String>,
    /// Access token sent as `X-Access-Token`
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Merge `hidden_data` over `data` when reading app settings
    pub merge_hidden_data: bool,
}

/// Outbound relay client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent sent to merchant webhooks
    pub user_agent: String,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level / EnvFilter directive
    pub log_level: String,
    /// Log format (json, pretty, compact)
    pub log_format: String,
    /// Expose Prometheus metrics
    pub metrics_enabled: bool,
    /// Metrics endpoint path
    pub metrics_path: String,
    /// Prometheus namespace for every metric
    pub metrics_namespace: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            webhook_path: "/ecom/webhook".to_string(),
            request_timeout: 30,
            max_body_size: 1024 * 1024,
        }
    }
}

impl Default for StoreApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.e-com.plus/v1".to_string(),
            application_id: String::new(),
            my_id: None,
            access_token: None,
            timeout_seconds: 15,
            merge_hidden_data: true,
        }
    }
}

impl Default for RelayClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            user_agent: format!("trigger-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
            metrics_namespace: "trigger_relay".to_string(),
        }
    }
}

impl RelayServiceConfig {
    /// Load configuration from defaults, optional file and environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let mut cfg = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.webhook_path", defaults.server.webhook_path)?
            .set_default("server.request_timeout", defaults.server.request_timeout as i64)?
            .set_default("server.max_body_size", defaults.server.max_body_size as i64)?
            .set_default("store_api.base_url", defaults.store_api.base_url)?
            .set_default("store_api.application_id", defaults.store_api.application_id)?
            .set_default(
                "store_api.timeout_seconds",
                defaults.store_api.timeout_seconds as i64,
            )?
            .set_default(
                "store_api.merge_hidden_data",
                defaults.store_api.merge_hidden_data,
            )?
            .set_default("relay.timeout_seconds", defaults.relay.timeout_seconds as i64)?
            .set_default("relay.user_agent", defaults.relay.user_agent)?
            .set_default("observability.log_level", defaults.observability.log_level)?
            .set_default("observability.log_format", defaults.observability.log_format)?
            .set_default(
                "observability.metrics_enabled",
                defaults.observability.metrics_enabled,
            )?
            .set_default(
                "observability.metrics_path",
                defaults.observability.metrics_path,
            )?
            .set_default(
                "observability.metrics_namespace",
                defaults.observability.metrics_namespace,
            )?;

        // Load from optional config file
        if let Ok(config_path) = std::env::var("TRIGGER_RELAY_CONFIG_FILE") {
            cfg = cfg.add_source(config::File::with_name(&config_path).required(false));
        }

        cfg = cfg.add_source(
            config::Environment::with_prefix("TRIGGER_RELAY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        cfg.build()?.try_deserialize()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if !self.server.webhook_path.starts_with('/') {
            return Err(format!(
                "Webhook path must start with '/': {}",
                self.server.webhook_path
            ));
        }

        if self.store_api.application_id.trim().is_empty() {
            return Err("Store API application id is required".to_string());
        }

        Url::parse(&self.store_api.base_url)
            .map_err(|e| format!("Invalid store API base URL: {}", e))?;

        if self.observability.metrics_enabled && !self.observability.metrics_path.starts_with('/')
        {
            return Err(format!(
                "Metrics path must start with '/': {}",
                self.observability.metrics_path
            ));
        }

        Ok(())
    }
}
