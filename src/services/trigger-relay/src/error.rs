//! Error types for the trigger relay service
//!
//! Three families live here: [`ServiceError`] for bootstrap and HTTP surface
//! failures, [`StoreApiError`] for calls against the store REST API, and
//! [`RelayError`] for the outbound webhook POST. Only store API failures during
//! the config stage are ever shown to the inbound caller; relay errors are
//! logged and swallowed by the dispatcher.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised while booting or serving the relay
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Bad inbound request (missing tenant header, etc.)
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Metrics registry errors
    #[error("Metrics error: {source}")]
    Metrics {
        #[from]
        source: prometheus::Error,
    },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Configuration { .. }
            | ServiceError::Metrics { .. }
            | ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error (for API responses)
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Configuration { .. } => "CONFIGURATION_ERROR",
            ServiceError::Validation { .. } => "VALIDATION_ERROR",
            ServiceError::Metrics { .. } => "METRICS_ERROR",
            ServiceError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_code = self.error_code();
        let error_message = self.to_string();

        tracing::warn!(
            error_code = error_code,
            error_message = %error_message,
            "Request rejected"
        );

        let body = Json(json!({
            "error": error_code,
            "message": error_message,
        }));

        (status_code, body).into_response()
    }
}

/// Failures talking to the store REST API
#[derive(Error, Debug)]
pub enum StoreApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for StoreApiError {
    fn from(err: reqwest::Error) -> Self {
        StoreApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StoreApiError {
    fn from(err: serde_json::Error) -> Self {
        StoreApiError::Parse(err.to_string())
    }
}

/// Failures of the outbound relay POST
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay transport error: {0}")]
    Transport(String),

    #[error("Relay target answered with status {status}")]
    Status { status: u16 },
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}
