//! Provider profiles and the provider directory.
//!
//! No concrete provider's wire format is normative; a profile describes a
//! generic JSON REST convention (base URL, endpoint paths, auth model) that
//! a hosted provider must satisfy. The directory is the set of providers a
//! deployment supports; a key absent from it is an unsupported provider.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::credentials::AuthKind;
use crate::error::{AdapterError, AdapterResult};
use crate::resilience::RetryConfig;

/// Endpoint paths on the provider API, relative to the base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointPaths {
    /// Lightweight connectivity probe (GET).
    #[serde(default = "default_ping")]
    pub ping: String,

    /// Customer collection: POST to create, GET with a query parameter to
    /// search.
    #[serde(default = "default_customers")]
    pub customers: String,

    /// Single customer (PUT to update). `{id}` is replaced.
    #[serde(default = "default_customer_by_id")]
    pub customer_by_id: String,

    /// Job collection (POST to create).
    #[serde(default = "default_jobs")]
    pub jobs: String,
}

fn default_ping() -> String {
    "/ping".to_string()
}

fn default_customers() -> String {
    "/customers".to_string()
}

fn default_customer_by_id() -> String {
    "/customers/{id}".to_string()
}

fn default_jobs() -> String {
    "/jobs".to_string()
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            ping: default_ping(),
            customers: default_customers(),
            customer_by_id: default_customer_by_id(),
            jobs: default_jobs(),
        }
    }
}

impl EndpointPaths {
    /// Substitute an id into a templated path.
    pub fn for_id(template: &str, id: &str) -> String {
        template.replace("{id}", id)
    }
}

/// HTTP timeout settings for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Overall request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl HttpSettings {
    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Everything the framework needs to talk to one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Stable provider key (lowercase, e.g. "acme_fsm").
    pub key: String,

    /// Human-readable name for display.
    pub display_name: String,

    /// Authentication model this provider requires.
    pub auth_kind: AuthKind,

    /// API base URL.
    pub base_url: String,

    /// OAuth2 token endpoint. Required when `auth_kind` is OAuth2.
    /// `{tenant_id}` is replaced with the credential's tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// OAuth2 scopes requested during the client-credentials exchange.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Header to carry a static API key. None means `Authorization: Bearer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_header: Option<String>,

    #[serde(default)]
    pub endpoints: EndpointPaths,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl ProviderProfile {
    /// Create a profile with defaults for everything but identity and URL.
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        auth_kind: AuthKind,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            auth_kind,
            base_url: base_url.into(),
            token_url: None,
            scopes: Vec::new(),
            api_key_header: None,
            endpoints: EndpointPaths::default(),
            http: HttpSettings::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the OAuth2 token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Set the OAuth2 scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Carry the API key in a named header instead of Authorization.
    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = Some(header.into());
        self
    }

    /// Validate the profile.
    pub fn validate(&self) -> AdapterResult<()> {
        if self.key.trim().is_empty() {
            return Err(AdapterError::validation("provider key is required"));
        }
        if self.base_url.is_empty() {
            return Err(AdapterError::validation("base_url is required"));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| AdapterError::validation(format!("invalid base_url: {e}")))?;

        match self.auth_kind {
            AuthKind::OAuth2 => {
                let token_url = self.token_url.as_deref().ok_or_else(|| {
                    AdapterError::validation("token_url is required for oauth2 providers")
                })?;
                url::Url::parse(&token_url.replace("{tenant_id}", "tenant"))
                    .map_err(|e| AdapterError::validation(format!("invalid token_url: {e}")))?;
            }
            AuthKind::ApiKey => {}
        }
        Ok(())
    }

    /// Build the full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Registry of supported providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    providers: HashMap<String, ProviderProfile>,
}

impl ProviderDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider profile. Replaces any existing profile with the
    /// same key.
    pub fn register(&mut self, profile: ProviderProfile) -> AdapterResult<()> {
        profile.validate()?;
        self.providers.insert(profile.key.clone(), profile);
        Ok(())
    }

    /// Look up a provider; unknown keys are unsupported providers.
    pub fn get(&self, key: &str) -> AdapterResult<&ProviderProfile> {
        self.providers
            .get(key)
            .ok_or_else(|| AdapterError::unsupported_provider(key))
    }

    /// Whether a provider key is supported.
    pub fn contains(&self, key: &str) -> bool {
        self.providers.contains_key(key)
    }

    /// All registered provider keys, sorted for stable display.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key_profile() -> ProviderProfile {
        ProviderProfile::new(
            "acme_fsm",
            "Acme FSM",
            AuthKind::ApiKey,
            "https://api.acme-fsm.example/v1",
        )
    }

    #[test]
    fn test_profile_validation() {
        assert!(api_key_profile().validate().is_ok());

        let no_url = ProviderProfile::new("x", "X", AuthKind::ApiKey, "");
        assert!(no_url.validate().is_err());

        let bad_url = ProviderProfile::new("x", "X", AuthKind::ApiKey, "not a url");
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_oauth2_profile_requires_token_url() {
        let profile = ProviderProfile::new(
            "orbit_crm",
            "Orbit CRM",
            AuthKind::OAuth2,
            "https://api.orbit.example",
        );
        assert!(profile.validate().is_err());

        let ok = profile.with_token_url("https://login.orbit.example/{tenant_id}/token");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_url_joining() {
        let profile = ProviderProfile::new(
            "acme_fsm",
            "Acme FSM",
            AuthKind::ApiKey,
            "https://api.example.com/v1/",
        );
        assert_eq!(profile.url("/customers"), "https://api.example.com/v1/customers");
        assert_eq!(profile.url("customers"), "https://api.example.com/v1/customers");
    }

    #[test]
    fn test_endpoint_id_substitution() {
        assert_eq!(
            EndpointPaths::for_id("/customers/{id}", "c-42"),
            "/customers/c-42"
        );
    }

    #[test]
    fn test_directory_lookup() {
        let mut dir = ProviderDirectory::new();
        dir.register(api_key_profile()).unwrap();

        assert!(dir.contains("acme_fsm"));
        assert!(dir.get("acme_fsm").is_ok());

        let err = dir.get("unknown_crm").unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_PROVIDER");
    }

    #[test]
    fn test_directory_keys_sorted() {
        let mut dir = ProviderDirectory::new();
        dir.register(api_key_profile()).unwrap();
        dir.register(ProviderProfile::new(
            "abc_crm",
            "Abc",
            AuthKind::ApiKey,
            "https://abc.example",
        ))
        .unwrap();

        assert_eq!(dir.keys(), vec!["abc_crm", "acme_fsm"]);
    }
}
