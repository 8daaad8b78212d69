//! API error types and responses.
//!
//! Errors are rendered in the same envelope as successful responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use chromegle_stats_engine::StatsError;

use crate::response::Envelope;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeds the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The request signature is missing or does not match the client.
    #[error("Unauthorized Request")]
    Unauthorized,

    /// An upstream lookup failed.
    #[error("{0}")]
    BadGateway(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Unauthorized => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::empty(self.status_code(), self.to_string()).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Validation(e) => Self::BadRequest(e.to_string()),
            StatsError::Geolocation { address, reason } => {
                tracing::warn!(address = %address, reason = %reason, "Geolocation failed");
                Self::BadGateway(format!("Failed to grab geolocation data for {address}"))
            }
            StatsError::Aggregation(e) => {
                tracing::error!(error = %e, "Aggregation error");
                Self::Internal("failed to compute statistics".to_string())
            }
            StatsError::Storage(e) => {
                tracing::error!(error = %e, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}
