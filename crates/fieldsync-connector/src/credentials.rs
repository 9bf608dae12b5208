//! Provider credential types.
//!
//! Credentials are a tagged union validated once at the vault boundary;
//! downstream code can rely on the required fields being present.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AdapterError, AdapterResult};

/// Placeholder substituted for secret fields in redacted output.
pub const REDACTED: &str = "***REDACTED***";

/// Authentication model a provider requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// OAuth2 client-credentials flow.
    OAuth2,
    /// Static bearer API key.
    ApiKey,
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthKind::OAuth2 => write!(f, "oauth2"),
            AuthKind::ApiKey => write!(f, "api_key"),
        }
    }
}

/// Credentials for one provider integration.
///
/// Serialized (encrypted) as the vault's secret blob. Never serialized to
/// API clients; responses only carry a `configured` flag.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderCredentials {
    /// OAuth2 client-credentials grant.
    #[serde(rename = "oauth2")]
    OAuth2 {
        client_id: String,
        client_secret: String,
        tenant_id: String,
    },

    /// Static API key sent as a bearer value.
    ApiKey { api_key: String },
}

impl ProviderCredentials {
    /// Create OAuth2 credentials.
    pub fn oauth2(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        ProviderCredentials::OAuth2 {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Create API key credentials.
    pub fn api_key(api_key: impl Into<String>) -> Self {
        ProviderCredentials::ApiKey {
            api_key: api_key.into(),
        }
    }

    /// The authentication model these credentials satisfy.
    pub fn auth_kind(&self) -> AuthKind {
        match self {
            ProviderCredentials::OAuth2 { .. } => AuthKind::OAuth2,
            ProviderCredentials::ApiKey { .. } => AuthKind::ApiKey,
        }
    }

    /// Validate required fields for the credential's auth model.
    ///
    /// This is the single validation point; call sites after the vault
    /// boundary can assume validity.
    pub fn validate(&self) -> AdapterResult<()> {
        match self {
            ProviderCredentials::OAuth2 {
                client_id,
                client_secret,
                tenant_id,
            } => {
                if client_id.trim().is_empty() {
                    return Err(AdapterError::validation("client_id is required"));
                }
                if client_secret.trim().is_empty() {
                    return Err(AdapterError::validation("client_secret is required"));
                }
                if tenant_id.trim().is_empty() {
                    return Err(AdapterError::validation("tenant_id is required"));
                }
            }
            ProviderCredentials::ApiKey { api_key } => {
                if api_key.trim().is_empty() {
                    return Err(AdapterError::validation("api_key is required"));
                }
            }
        }
        Ok(())
    }

    /// Check that the credential variant matches the auth model a provider
    /// profile declares.
    pub fn validate_for(&self, expected: AuthKind) -> AdapterResult<()> {
        if self.auth_kind() != expected {
            return Err(AdapterError::validation(format!(
                "provider requires {expected} credentials, got {}",
                self.auth_kind()
            )));
        }
        self.validate()
    }

    /// Fingerprint identifying this credential set without exposing secrets.
    ///
    /// Used to key the OAuth2 token cache; includes only non-secret fields
    /// plus a hash of the secret so rotating a secret invalidates cached
    /// tokens.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            ProviderCredentials::OAuth2 {
                client_id,
                client_secret,
                tenant_id,
            } => {
                hasher.update(b"oauth2:");
                hasher.update(client_id.as_bytes());
                hasher.update(b":");
                hasher.update(tenant_id.as_bytes());
                hasher.update(b":");
                hasher.update(Sha256::digest(client_secret.as_bytes()));
            }
            ProviderCredentials::ApiKey { api_key } => {
                hasher.update(b"api_key:");
                hasher.update(Sha256::digest(api_key.as_bytes()));
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Redacted copy for logging and display.
    pub fn redacted(&self) -> Self {
        match self {
            ProviderCredentials::OAuth2 {
                client_id,
                tenant_id,
                ..
            } => ProviderCredentials::OAuth2 {
                client_id: client_id.clone(),
                client_secret: REDACTED.to_string(),
                tenant_id: tenant_id.clone(),
            },
            ProviderCredentials::ApiKey { .. } => ProviderCredentials::ApiKey {
                api_key: REDACTED.to_string(),
            },
        }
    }
}

// Manual Debug so secrets never leak through logging.
impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderCredentials::OAuth2 {
                client_id,
                tenant_id,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &REDACTED)
                .field("tenant_id", tenant_id)
                .finish(),
            ProviderCredentials::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &REDACTED)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth2_validation() {
        let creds = ProviderCredentials::oauth2("client", "secret", "tenant");
        assert!(creds.validate().is_ok());

        let missing = ProviderCredentials::oauth2("client", "", "tenant");
        assert!(missing.validate().is_err());

        let blank = ProviderCredentials::oauth2("  ", "secret", "tenant");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_api_key_validation() {
        assert!(ProviderCredentials::api_key("abc123").validate().is_ok());
        assert!(ProviderCredentials::api_key("").validate().is_err());
    }

    #[test]
    fn test_validate_for_wrong_kind() {
        let creds = ProviderCredentials::api_key("abc123");
        let err = creds.validate_for(AuthKind::OAuth2).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION");
        assert!(creds.validate_for(AuthKind::ApiKey).is_ok());
    }

    #[test]
    fn test_fingerprint_stable_and_secret_sensitive() {
        let a = ProviderCredentials::oauth2("client", "secret", "tenant");
        let b = ProviderCredentials::oauth2("client", "secret", "tenant");
        assert_eq!(a.fingerprint(), b.fingerprint());

        let rotated = ProviderCredentials::oauth2("client", "new-secret", "tenant");
        assert_ne!(a.fingerprint(), rotated.fingerprint());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = ProviderCredentials::oauth2("client", "super-secret", "tenant");
        let debug = format!("{creds:?}");
        assert!(debug.contains(REDACTED));
        assert!(!debug.contains("super-secret"));

        let key = ProviderCredentials::api_key("abc123");
        let debug = format!("{key:?}");
        assert!(!debug.contains("abc123"));
    }

    #[test]
    fn test_serde_tagged_union() {
        let creds = ProviderCredentials::api_key("abc123");
        let json = serde_json::to_string(&creds).unwrap();
        assert!(json.contains("\"type\":\"api_key\""));

        let parsed: ProviderCredentials =
            serde_json::from_str(r#"{"type":"oauth2","client_id":"c","client_secret":"s","tenant_id":"t"}"#)
                .unwrap();
        assert_eq!(parsed.auth_kind(), AuthKind::OAuth2);
    }
}
