//! Adapter error types with transient/permanent classification.
//!
//! The retry layer only retries transient errors; everything else is
//! surfaced to the orchestrator as a per-item failure.

use thiserror::Error;

/// Error that can occur during provider adapter operations.
#[derive(Debug, Error)]
pub enum AdapterError {
    // Transient: temporary conditions that may resolve on retry.
    /// Failed to establish a connection to the provider.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider call exceeded the bounded timeout.
    #[error("request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Provider is temporarily unavailable (5xx, 429).
    #[error("provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// Network error during communication.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Permanent: retry will not help.
    /// Credentials rejected by the remote system.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A previously issued token is no longer accepted.
    #[error("authentication failed: credentials expired")]
    CredentialsExpired,

    /// The provider rejected the payload (400/422).
    #[error("provider rejected request: {message}")]
    RemoteValidation { message: String },

    /// Configuration input failed validation.
    #[error("invalid configuration: {message}")]
    Validation { message: String },

    /// Provider key is not registered in the directory.
    #[error("unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// Could not encrypt a credential blob.
    #[error("encryption failed: {message}")]
    EncryptionFailed { message: String },

    /// Could not decrypt a credential blob.
    #[error("decryption failed: {message}")]
    DecryptionFailed { message: String },

    /// Response from the provider could not be interpreted.
    #[error("malformed provider response: {message}")]
    MalformedResponse { message: String },

    /// Serialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl AdapterError {
    /// Whether this error is transient and the operation may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. }
                | AdapterError::Timeout { .. }
                | AdapterError::ProviderUnavailable { .. }
                | AdapterError::Network { .. }
        )
    }

    /// Whether this error is permanent and retry will not help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Stable code for classification and logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AdapterError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            AdapterError::Timeout { .. } => "TIMEOUT",
            AdapterError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
            AdapterError::Network { .. } => "NETWORK_ERROR",
            AdapterError::AuthenticationFailed { .. } => "AUTH_FAILED",
            AdapterError::CredentialsExpired => "CREDENTIALS_EXPIRED",
            AdapterError::RemoteValidation { .. } => "REMOTE_VALIDATION",
            AdapterError::Validation { .. } => "VALIDATION",
            AdapterError::UnsupportedProvider { .. } => "UNSUPPORTED_PROVIDER",
            AdapterError::EncryptionFailed { .. } => "ENCRYPTION_FAILED",
            AdapterError::DecryptionFailed { .. } => "DECRYPTION_FAILED",
            AdapterError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            AdapterError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        AdapterError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdapterError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        AdapterError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AdapterError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication failed error.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        AdapterError::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        AdapterError::Validation {
            message: message.into(),
        }
    }

    /// Create an unsupported provider error.
    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        AdapterError::UnsupportedProvider {
            provider: provider.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        AdapterError::MalformedResponse {
            message: message.into(),
        }
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
