use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::UpdateAction;

/// Error body understood by the commerce platform's API extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionErrorResponse {
    pub errors: Vec<ExtensionError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionError {
    /// `InvalidInput` for bad payment data, `InvalidOperation` otherwise
    pub code: String,
    pub message: String,
}

impl ExtensionErrorResponse {
    pub fn single(code: &str, message: String) -> Self {
        Self {
            errors: vec![ExtensionError {
                code: code.to_string(),
                message,
            }],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous result: {0}")]
    AmbiguousResult(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Payment provider rejected the request for merchant account {merchant_account} with status {status}")]
    ProviderRejected {
        merchant_account: String,
        status: u16,
        /// Actions recorded for the exchange; never dropped on failure.
        actions: Vec<UpdateAction>,
    },

    #[error("Payment provider unreachable for merchant account {merchant_account}: {message}")]
    ProviderUnavailable {
        merchant_account: String,
        message: String,
        actions: Vec<UpdateAction>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AmbiguousResult(_) => StatusCode::CONFLICT,
            Self::UpstreamUnavailable(_)
            | Self::ProviderRejected { .. }
            | Self::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::SerializationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Update actions recorded before the error surfaced (provider failures only).
    pub fn recorded_actions(&self) -> Option<&[UpdateAction]> {
        match self {
            Self::ProviderRejected { actions, .. } | Self::ProviderUnavailable { actions, .. } => {
                Some(actions)
            }
            _ => None,
        }
    }

    /// Consumes the error, keeping only the recorded actions.
    pub fn into_recorded_actions(self) -> Option<Vec<UpdateAction>> {
        match self {
            Self::ProviderRejected { actions, .. } | Self::ProviderUnavailable { actions, .. } => {
                Some(actions)
            }
            _ => None,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::Configuration(_) | Self::SerializationError(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn extension_code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "InvalidInput",
            _ => "InvalidOperation",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        // Extensions reject with 400; the platform discards any other status.
        let body = ExtensionErrorResponse::single(self.extension_code(), self.response_message());
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
