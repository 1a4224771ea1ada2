// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of error kinds to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use wagate_core::{ErrorKind, WagateError};

/// Failure body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    details: Option<serde_json::Value>,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError | ErrorKind::InvalidRecipient => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists | ErrorKind::AlreadyConnected | ErrorKind::NotAwaitingQr => {
            StatusCode::CONFLICT
        }
        ErrorKind::NotConnected => StatusCode::PRECONDITION_FAILED,
        ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
    }
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unauthorized,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
            details: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }
}

impl From<WagateError> for ApiError {
    fn from(err: WagateError) -> Self {
        let kind = err.kind();
        let details = match &err {
            WagateError::NotAwaitingQr { status, .. } => Some(json!({ "status": status })),
            WagateError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            WagateError::Timeout { duration } => {
                Some(json!({ "timeoutMs": u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) }))
            }
            _ => None,
        };
        let message = match kind {
            ErrorKind::InternalError => {
                tracing::error!(error = %err, "request failed with an internal error");
                "internal error".to_string()
            }
            ErrorKind::UpstreamError => {
                tracing::warn!(error = %err, "remote client error");
                err.to_string()
            }
            _ => err.to_string(),
        };
        Self {
            kind,
            message,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.kind.to_string(),
            message: self.message,
            details: self.details,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (WagateError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WagateError::InvalidRecipient("x".into()), StatusCode::BAD_REQUEST),
            (WagateError::session_not_found("s"), StatusCode::NOT_FOUND),
            (
                WagateError::NotConnected {
                    session_id: "s".into(),
                },
                StatusCode::PRECONDITION_FAILED,
            ),
            (WagateError::upstream("down"), StatusCode::BAD_GATEWAY),
            (WagateError::ShuttingDown, StatusCode::SERVICE_UNAVAILABLE),
            (WagateError::Internal("bug".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::unauthorized("no").status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    #[traced_test]
    fn internal_details_are_not_leaked() {
        let api = ApiError::from(WagateError::Internal("db path /secret".into()));
        assert_eq!(api.message, "internal error");
        assert!(logs_contain("request failed with an internal error"));
    }

    #[test]
    fn body_uses_snake_case_codes() {
        let api = ApiError::from(WagateError::NotAwaitingQr {
            session_id: "s".into(),
            status: "Disconnected".into(),
        });
        let body = ErrorBody {
            error: api.kind().to_string(),
            message: api.message.clone(),
            details: api.details.clone(),
            timestamp: String::new(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "not_awaiting_qr");
        assert_eq!(value["details"]["status"], "Disconnected");
    }
}
