//! Service wiring for the trigger relay: clients, dispatcher, HTTP middleware
//! and graceful shutdown.

use crate::clients::{HttpRelayClient, StoreApiClient};
use crate::config::RelayServiceConfig;
use crate::dispatcher::TriggerDispatcher;
use crate::error::{ServiceError, ServiceResult};
use crate::handlers::{probe_routes, webhook_routes, AppState};
use crate::metrics::RelayMetrics;
use axum::serve;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Main relay service
pub struct TriggerRelayService {
    app_state: Arc<AppState>,
    addr: SocketAddr,
}

/// Custom request ID generator
#[derive(Clone, Default)]
struct CustomMakeRequestId;

impl MakeRequestId for CustomMakeRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = format!("req-{}", Uuid::new_v4());
        axum::http::HeaderValue::from_str(&id)
            .ok()
            .map(RequestId::new)
    }
}

impl TriggerRelayService {
    /// Create a new relay service
    pub fn new(config: RelayServiceConfig) -> ServiceResult<Self> {
        info!("Initializing trigger relay service");

        config.validate().map_err(ServiceError::configuration)?;

        let store_api = Arc::new(StoreApiClient::new(&config.store_api).map_err(|e| {
            ServiceError::internal(format!("Failed to create store API client: {}", e))
        })?);

        let relay_client = HttpRelayClient::new(&config.relay).map_err(|e| {
            ServiceError::internal(format!("Failed to create relay client: {}", e))
        })?;

        let dispatcher =
            TriggerDispatcher::new(store_api.clone(), store_api, Arc::new(relay_client));

        let metrics = if config.observability.metrics_enabled {
            Some(RelayMetrics::new(&config.observability.metrics_namespace)?)
        } else {
            None
        };

        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ServiceError::configuration(format!("Invalid server address: {}", e)))?;

        Ok(Self {
            app_state: Arc::new(AppState {
                config,
                dispatcher,
                metrics,
            }),
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Router with the full middleware stack
    pub fn router(&self) -> axum::Router {
        let timeout = Duration::from_secs(self.app_state.config.server.request_timeout);
        let request_id = axum::http::HeaderName::from_static(REQUEST_ID_HEADER);

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(
                request_id.clone(),
                CustomMakeRequestId,
            ))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id));

        // Only probes get the request timeout; the webhook always answers
        // once its relay attempt has settled
        let probes = probe_routes(self.app_state.clone()).layer(TimeoutLayer::new(timeout));

        webhook_routes(self.app_state.clone())
            .merge(probes)
            .layer(middleware)
    }

    /// Start the relay service
    pub async fn start(self) -> ServiceResult<()> {
        info!("Starting trigger relay service on {}", self.addr);

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| ServiceError::internal(format!("Failed to bind to address: {}", e)))?;

        info!(
            webhook_path = %self.app_state.config.server.webhook_path,
            "Trigger relay listening on {}", self.addr
        );

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(ServiceError::internal(format!("Server error: {}", e)));
        }

        info!("Trigger relay service stopped gracefully");
        Ok(())
    }

    /// Wait for shutdown signal
    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install signal handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate => {
                info!("Received terminate signal, shutting down");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let mut config = RelayServiceConfig::default();
        config.store_api.application_id = "1234".to_string();
        config.server.port = 8089;

        let service = TriggerRelayService::new(config).unwrap();
        assert_eq!(service.addr().port(), 8089);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = TriggerRelayService::new(RelayServiceConfig::default());
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }
}
