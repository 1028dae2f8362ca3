// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from the error taxonomy onto HTTP responses.
//!
//! Clients observe either a stream of audio bytes or a JSON error body
//! `{code, message}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use voxa_core::VoxaError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Wrapper giving [`VoxaError`] an HTTP rendering.
#[derive(Debug)]
pub struct ApiError(pub VoxaError);

impl From<VoxaError> for ApiError {
    fn from(e: VoxaError) -> Self {
        Self(e)
    }
}

fn status_for(error: &VoxaError) -> StatusCode {
    match error {
        VoxaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        VoxaError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
        VoxaError::NotFound(_) => StatusCode::NOT_FOUND,
        VoxaError::Gone(_) => StatusCode::GONE,
        VoxaError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        VoxaError::AlreadyExists(_) => StatusCode::CONFLICT,
        VoxaError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VoxaError::Limit(_) => StatusCode::PAYLOAD_TOO_LARGE,
        VoxaError::Moderation(_) => StatusCode::OK,
        VoxaError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        VoxaError::Canceled => StatusCode::REQUEST_TIMEOUT,
        VoxaError::Connection { .. } => StatusCode::BAD_GATEWAY,
        VoxaError::Consistency(_) | VoxaError::Config(_) | VoxaError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "request rejected");
        }
        let body = ErrorBody {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            status_for(&VoxaError::PaymentRequired("x".into())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status_for(&VoxaError::Gone("x".into())), StatusCode::GONE);
        assert_eq!(
            status_for(&VoxaError::Limit("x".into())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&VoxaError::DeadlineExceeded {
                duration: std::time::Duration::from_secs(60)
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&VoxaError::Consistency("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
