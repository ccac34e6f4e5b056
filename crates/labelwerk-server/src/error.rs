// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error boundary: the one place a `LabelwerkError` becomes a response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use labelwerk_core::error::LabelwerkError;

/// A failed request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<LabelwerkError> for ApiError {
    fn from(err: LabelwerkError) -> Self {
        match err {
            LabelwerkError::NotFound(what) => Self::not_found(format!("{what} not found")),
            LabelwerkError::InvalidRequest(msg) => Self::bad_request(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (LabelwerkError::NotFound("job 1".into()), StatusCode::NOT_FOUND),
            (LabelwerkError::InvalidRequest("bad id".into()), StatusCode::BAD_REQUEST),
            (LabelwerkError::Database("locked".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (LabelwerkError::QueueFull, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn response_carries_status() {
        let response = ApiError::not_found("image x not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
