//! API error type and response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fieldsync_connector::AdapterError;
use fieldsync_sync::SyncError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by the integrations API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("provider {0} is not configured")]
    NotConfigured(String),

    #[error("{0}")]
    NotFound(String),

    #[error("a sync run is already in progress for provider {0}")]
    Conflict(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
            ApiError::NotConfigured(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            ApiError::NotConfigured(_) => "NOT_CONFIGURED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "SYNC_IN_PROGRESS",
            ApiError::Provider(_) => "PROVIDER_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Validation { message } => ApiError::Validation(message),
            SyncError::UnsupportedProvider { provider } => ApiError::UnsupportedProvider(provider),
            SyncError::NotConfigured { provider } => ApiError::NotConfigured(provider),
            SyncError::Conflict { provider } => ApiError::Conflict(provider),
            SyncError::Adapter(e) => e.into(),
            SyncError::Storage { .. } | SyncError::Internal { .. } => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(e: AdapterError) -> Self {
        match e {
            AdapterError::Validation { message } => ApiError::Validation(message),
            AdapterError::UnsupportedProvider { provider } => {
                ApiError::UnsupportedProvider(provider)
            }
            AdapterError::EncryptionFailed { .. }
            | AdapterError::DecryptionFailed { .. }
            | AdapterError::Serialization { .. } => ApiError::Internal(e.to_string()),
            other => ApiError::Provider(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal detail is logged, never leaked.
        let message = if let ApiError::Internal(detail) = &self {
            error!(%detail, "internal API error");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
