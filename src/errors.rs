use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Stable error categories surfaced to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    InvalidIdentifier,
    InvalidRequest,
    Unauthorized,
    NotFound,
    UnsupportedMediaType,
    PayloadTooLarge,
    #[serde(rename = "IOFault")]
    IoFault,
    ProbeFailed,
    MalformedMetadata,
    OptimizationFailed,
    StoreUnavailable,
    StoreRejected,
    PersistenceFailure,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidIdentifier => "InvalidIdentifier",
            ErrorCategory::InvalidRequest => "InvalidRequest",
            ErrorCategory::Unauthorized => "Unauthorized",
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::UnsupportedMediaType => "UnsupportedMediaType",
            ErrorCategory::PayloadTooLarge => "PayloadTooLarge",
            ErrorCategory::IoFault => "IOFault",
            ErrorCategory::ProbeFailed => "ProbeFailed",
            ErrorCategory::MalformedMetadata => "MalformedMetadata",
            ErrorCategory::OptimizationFailed => "OptimizationFailed",
            ErrorCategory::StoreUnavailable => "StoreUnavailable",
            ErrorCategory::StoreRejected => "StoreRejected",
            ErrorCategory::PersistenceFailure => "PersistenceFailure",
            ErrorCategory::Internal => "Internal",
        }
    }

    /// HTTP status a category maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::InvalidIdentifier | ErrorCategory::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCategory::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorCategory::IoFault
            | ErrorCategory::ProbeFailed
            | ErrorCategory::MalformedMetadata
            | ErrorCategory::OptimizationFailed
            | ErrorCategory::StoreUnavailable
            | ErrorCategory::StoreRejected
            | ErrorCategory::PersistenceFailure
            | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message for server-side failures.
    ///
    /// Internal error text stays in the logs; 5xx responses only carry this.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorCategory::IoFault => "Couldn't stage the upload",
            ErrorCategory::ProbeFailed => "Couldn't inspect the video",
            ErrorCategory::MalformedMetadata => "Couldn't read the video metadata",
            ErrorCategory::OptimizationFailed => "Couldn't process the video",
            ErrorCategory::StoreUnavailable => "Object storage is unavailable",
            ErrorCategory::StoreRejected => "Object storage rejected the upload",
            ErrorCategory::PersistenceFailure => "Couldn't save the video record",
            _ => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lightweight wrapper for request errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub category: ErrorCategory,
    pub message: String,
}

impl AppError {
    /// Create a new AppError for a category, using the category's status.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            status: category.status(),
            category,
            message: msg.into(),
        }
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::NotFound, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unauthorized, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidRequest, msg)
    }

    /// Build an error from a category, hiding `detail` unless it is a client error.
    pub fn categorized(category: ErrorCategory, detail: impl fmt::Display) -> Self {
        if category.status().is_server_error() {
            tracing::error!(category = %category, "request failed: {}", detail);
            Self::new(category, category.public_message())
        } else {
            tracing::debug!(category = %category, "request rejected: {}", detail);
            Self::new(category, detail.to_string())
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "category": self.category,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::categorized(ErrorCategory::Internal, format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_documented_statuses() {
        assert_eq!(
            ErrorCategory::InvalidIdentifier.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCategory::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCategory::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ErrorCategory::UnsupportedMediaType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        for category in [
            ErrorCategory::IoFault,
            ErrorCategory::ProbeFailed,
            ErrorCategory::MalformedMetadata,
            ErrorCategory::OptimizationFailed,
            ErrorCategory::StoreUnavailable,
            ErrorCategory::StoreRejected,
            ErrorCategory::PersistenceFailure,
        ] {
            assert_eq!(category.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn server_errors_hide_internal_detail() {
        let err = AppError::categorized(
            ErrorCategory::ProbeFailed,
            "ffprobe exited with status 1: /tmp/tubely-upload-x.mp4: moov atom not found",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("/tmp"));
        assert_eq!(err.message, "Couldn't inspect the video");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::categorized(ErrorCategory::PayloadTooLarge, "upload exceeds 10 bytes");
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.message, "upload exceeds 10 bytes");
    }

    #[test]
    fn category_serializes_with_wire_name() {
        let value = serde_json::to_value(ErrorCategory::IoFault).unwrap();
        assert_eq!(value, json!("IOFault"));
    }
}
