//! The response envelope shared by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Response body of the form `{status, message, payload}`.
///
/// `status` mirrors the HTTP status code; `payload` is `null` when there is
/// nothing to return.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable outcome.
    pub message: String,
    /// Endpoint-specific data.
    pub payload: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    /// A successful response carrying a payload.
    #[must_use]
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.into(),
            payload: Some(payload),
        }
    }
}

impl Envelope<()> {
    /// A response without payload.
    #[must_use]
    pub fn empty(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            payload: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_envelope_serializes_null_payload() {
        let body = serde_json::to_value(Envelope::empty(StatusCode::OK, "Received Statistics"))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": 200, "message": "Received Statistics", "payload": null})
        );
    }

    #[test]
    fn status_follows_envelope() {
        let response = Envelope::empty(StatusCode::BAD_REQUEST, "nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Envelope::ok("fine", 1u8).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
