//! Sync engine error types.

use fieldsync_connector::AdapterError;
use thiserror::Error;

/// Error that can occur in the synchronization engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No credentials configured for the (company, provider) pair.
    #[error("provider {provider} is not configured")]
    NotConfigured { provider: String },

    /// Provider key is not in the supported set.
    #[error("unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// Input failed validation.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// A sync run is already active for this (company, provider) pair.
    #[error("a sync run is already in progress for provider {provider}")]
    Conflict { provider: String },

    /// Adapter-level failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Storage backend failure.
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unexpected internal failure.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// Create a not-configured error.
    pub fn not_configured(provider: impl Into<String>) -> Self {
        SyncError::NotConfigured {
            provider: provider.into(),
        }
    }

    /// Create an unsupported-provider error.
    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        SyncError::UnsupportedProvider {
            provider: provider.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation {
            message: message.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(provider: impl Into<String>) -> Self {
        SyncError::Conflict {
            provider: provider.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        SyncError::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error with source.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SyncError::Internal {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::storage_with_source("database operation failed", e)
    }
}

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
