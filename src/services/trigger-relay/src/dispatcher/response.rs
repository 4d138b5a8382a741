//! Maps every dispatch outcome to the response seen by the store platform

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::enrichment::ShortCircuit;
use super::filter::PassThroughReason;
use super::relay::RelayOutcome;

/// Plain-text tags echoed back to the store platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Success,
    Skip,
    StoreApiError,
}

impl Echo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Echo::Success => "SUCCESS",
            Echo::Skip => "SKIP",
            Echo::StoreApiError => "STORE_API_ERR",
        }
    }
}

/// Result of one dispatch, from config lookup to relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Skipped,
    PassedThrough(PassThroughReason),
    ShortCircuited(ShortCircuit),
    /// Resource or customer lookup failed; nothing relayed
    LookupFailed { reason: String },
    Relayed(RelayOutcome),
    /// App data could not be read from the store API
    ConfigFailed { message: String },
}

impl DispatchOutcome {
    /// Stable label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Skipped => "skipped",
            DispatchOutcome::PassedThrough(reason) => reason.as_str(),
            DispatchOutcome::ShortCircuited(reason) => reason.as_str(),
            DispatchOutcome::LookupFailed { .. } => "lookup_failed",
            DispatchOutcome::Relayed(_) => "relayed",
            DispatchOutcome::ConfigFailed { .. } => "config_failed",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchOutcome::PassedThrough(PassThroughReason::NoRelayUrl) => StatusCode::ACCEPTED,
            DispatchOutcome::ShortCircuited(reason) => reason.status_code(),
            DispatchOutcome::ConfigFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchOutcome::Skipped
            | DispatchOutcome::PassedThrough(_)
            | DispatchOutcome::LookupFailed { .. }
            | DispatchOutcome::Relayed(_) => StatusCode::OK,
        }
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            DispatchOutcome::Skipped => (status, Echo::Skip.as_str()).into_response(),
            DispatchOutcome::PassedThrough(PassThroughReason::NoRelayUrl)
            | DispatchOutcome::ShortCircuited(_) => status.into_response(),
            DispatchOutcome::PassedThrough(_)
            | DispatchOutcome::LookupFailed { .. }
            | DispatchOutcome::Relayed(_) => (status, Echo::Success.as_str()).into_response(),
            DispatchOutcome::ConfigFailed { message } => (
                status,
                Json(json!({
                    "error": Echo::StoreApiError.as_str(),
                    "message": message,
                })),
            )
                .into_response(),
        }
    }
}
