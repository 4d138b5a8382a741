//! HTTP handlers for the trigger relay service
//!
//! The webhook route receives store triggers; the remaining routes are health
//! probes and the optional Prometheus endpoint.

use crate::dispatcher::TriggerDispatcher;
use crate::error::ServiceError;
use crate::metrics::RelayMetrics;
use crate::models::{StoreId, Trigger};
use crate::{config::RelayServiceConfig, HealthStatus};
use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Header carrying the tenant id on every store trigger
pub const STORE_ID_HEADER: &str = "x-store-id";

/// Application state shared across handlers
pub struct AppState {
    pub config: RelayServiceConfig,
    pub dispatcher: TriggerDispatcher,
    /// `None` when metrics are disabled
    pub metrics: Option<RelayMetrics>,
}

/// Create all routes for the relay service
pub fn create_routes(state: Arc<AppState>) -> Router {
    webhook_routes(state.clone()).merge(probe_routes(state))
}

/// Store trigger route. No whole-request timeout applies here; its duration
/// is bounded by the store API and relay client timeouts.
pub fn webhook_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.config.server.webhook_path, post(trigger_webhook))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
        .with_state(state)
}

/// Health probes and the optional Prometheus endpoint
pub fn probe_routes(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    if state.config.observability.metrics_enabled {
        router = router.route(&state.config.observability.metrics_path, get(metrics_handler));
    }

    router.with_state(state)
}

/// Store id taken from the `X-Store-ID` request header
#[derive(Debug, Clone, Copy)]
pub struct TenantStoreId(pub StoreId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantStoreId {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(STORE_ID_HEADER)
            .ok_or_else(|| ServiceError::validation(STORE_ID_HEADER, "header is missing"))?
            .to_str()
            .map_err(|_| ServiceError::validation(STORE_ID_HEADER, "header is not valid text"))?;

        raw.parse::<StoreId>()
            .map(TenantStoreId)
            .map_err(|_| ServiceError::validation(STORE_ID_HEADER, "must be a numeric store id"))
    }
}

/// Store trigger webhook
async fn trigger_webhook(
    State(state): State<Arc<AppState>>,
    TenantStoreId(store_id): TenantStoreId,
    Json(trigger): Json<Trigger>,
) -> Response {
    debug!(store_id = %store_id, resource = %trigger.resource, "Trigger received");

    let resource = trigger.resource.metric_label();
    let outcome = state.dispatcher.dispatch(store_id, trigger).await;

    if let Some(metrics) = &state.metrics {
        metrics.record(resource, &outcome);
    }

    outcome.into_response()
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// Liveness check endpoint (for Kubernetes)
async fn liveness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "alive"})))
}

/// Metrics endpoint (Prometheus format)
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = &state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match metrics.export() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to export metrics");
            e.into_response()
        }
    }
}
