// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

/// API error variants, serialized as `{"error": "<message>"}`
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The multipart request carried no `image` field
    MissingImage,
    InvalidRequest(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::MissingImage | ApiError::InvalidRequest(_) => 400,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Fixed client-facing message for the one explicit validation
            ApiError::MissingImage => write!(f, "No image file"),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MissingImage.status_code(), 400);
        assert_eq!(ApiError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(ApiError::ServiceUnavailable("x".into()).status_code(), 503);
        assert_eq!(ApiError::InternalError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_missing_image_message_is_fixed() {
        assert_eq!(ApiError::MissingImage.to_string(), "No image file");
    }

    #[test]
    fn test_internal_error_display() {
        let err = ApiError::InternalError("decode failed".into());
        assert_eq!(err.to_string(), "Internal error: decode failed");
    }
}
