//! OAuth2 client-credentials adapter.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::{AuthKind, ProviderCredentials};
use crate::error::{AdapterError, AdapterResult};
use crate::profile::{EndpointPaths, ProviderProfile};
use crate::token::{IssuedToken, TokenCache};
use crate::traits::ProviderAdapter;
use crate::types::{CustomerQuery, CustomerRecord, JobRecord, RemoteCustomer, TestOutcome};

use super::{
    build_client, customer_payload, job_payload, parse_customers, status_error, transport_error,
};

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Adapter for providers using the OAuth2 client-credentials grant.
///
/// Access tokens are cached per credential fingerprint in the shared
/// [`TokenCache`]; a 401 from the provider invalidates the cached token
/// and the request is retried once with a fresh one.
pub struct OAuth2Adapter {
    profile: ProviderProfile,
    client_id: String,
    client_secret: String,
    tenant_id: String,
    fingerprint: String,
    client: Client,
    tokens: Arc<TokenCache>,
}

impl std::fmt::Debug for OAuth2Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Adapter")
            .field("provider", &self.profile.key)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***REDACTED***")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl OAuth2Adapter {
    /// Create an adapter from a profile and OAuth2 credentials.
    pub fn new(
        profile: ProviderProfile,
        credentials: &ProviderCredentials,
        tokens: Arc<TokenCache>,
    ) -> AdapterResult<Self> {
        profile.validate()?;
        credentials.validate_for(AuthKind::OAuth2)?;

        let ProviderCredentials::OAuth2 {
            client_id,
            client_secret,
            tenant_id,
        } = credentials
        else {
            unreachable!("validate_for checked the variant");
        };

        let fingerprint = credentials.fingerprint();
        let client = build_client(&profile.http)?;
        Ok(Self {
            profile,
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            tenant_id: tenant_id.clone(),
            fingerprint,
            client,
            tokens,
        })
    }

    fn token_url(&self) -> AdapterResult<String> {
        let template = self.profile.token_url.as_deref().ok_or_else(|| {
            AdapterError::validation("token_url is required for oauth2 providers")
        })?;
        Ok(template.replace("{tenant_id}", &self.tenant_id))
    }

    async fn fetch_token(&self) -> AdapterResult<IssuedToken> {
        let url = self.token_url()?;

        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let scope = self.profile.scopes.join(" ");
        if !scope.is_empty() {
            form.push(("scope", scope.as_str()));
        }

        debug!(provider = %self.profile.key, "exchanging client credentials");
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(e, self.profile.http.request_timeout()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AdapterError::network_with_source("failed to read token response", e))?;

        if !status.is_success() {
            // Any rejection of the grant itself means the credentials are bad.
            return match status_error(status, &text) {
                e if e.is_transient() => Err(e),
                _ => Err(AdapterError::auth_failed(format!(
                    "token exchange rejected: HTTP {status}"
                ))),
            };
        }

        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            AdapterError::malformed_response(format!("invalid token response: {e}"))
        })?;

        Ok(IssuedToken {
            access_token: parsed.access_token,
            expires_in_secs: parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
        })
    }

    async fn bearer(&self) -> AdapterResult<String> {
        self.tokens
            .get_or_refresh(&self.fingerprint, || self.fetch_token())
            .await
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
        query: Option<(&str, &str)>,
    ) -> AdapterResult<Value> {
        let mut token = self.bearer().await?;

        // One retry with a fresh token if the provider rejects the cached one.
        for attempt in 0..2 {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .header(header::AUTHORIZATION, format!("Bearer {token}"));
            if let Some(body) = &body {
                builder = builder.json(body);
            }
            if let Some((key, value)) = query {
                builder = builder.query(&[(key, value)]);
            }

            debug!(provider = %self.profile.key, %method, %url, "provider request");
            let response = builder
                .send()
                .await
                .map_err(|e| transport_error(e, self.profile.http.request_timeout()))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!(provider = %self.profile.key, "cached token rejected, re-authenticating");
                self.tokens.invalidate(&self.fingerprint).await;
                token = self.bearer().await?;
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| AdapterError::network_with_source("failed to read response", e))?;

            if !status.is_success() {
                return Err(status_error(status, &text));
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| AdapterError::malformed_response(format!("invalid JSON: {e}")));
        }

        Err(AdapterError::auth_failed("token rejected after re-auth"))
    }
}

#[async_trait]
impl ProviderAdapter for OAuth2Adapter {
    fn provider(&self) -> &str {
        &self.profile.key
    }

    async fn test_connection(&self) -> TestOutcome {
        let url = self.profile.url(&self.profile.endpoints.ping);
        match self.send(Method::GET, url, None, None).await {
            Ok(_) => TestOutcome::ok("connected"),
            Err(e) => TestOutcome::failed(e.to_string()),
        }
    }

    async fn find_customer(&self, query: &CustomerQuery) -> AdapterResult<Option<RemoteCustomer>> {
        let url = self.profile.url(&self.profile.endpoints.customers);
        let body = self
            .send(Method::GET, url, None, Some((query.param(), query.value())))
            .await?;
        Ok(parse_customers(&body)?.into_iter().next())
    }

    async fn create_customer(&self, customer: &CustomerRecord) -> AdapterResult<String> {
        let url = self.profile.url(&self.profile.endpoints.customers);
        let body = self
            .send(Method::POST, url, Some(customer_payload(customer)), None)
            .await?;
        super::extract_id(&body)
    }

    async fn update_customer(
        &self,
        remote_id: &str,
        customer: &CustomerRecord,
    ) -> AdapterResult<String> {
        let path = EndpointPaths::for_id(&self.profile.endpoints.customer_by_id, remote_id);
        let url = self.profile.url(&path);
        let body = self
            .send(Method::PUT, url, Some(customer_payload(customer)), None)
            .await?;
        match super::extract_id(&body) {
            Ok(id) => Ok(id),
            Err(_) => Ok(remote_id.to_string()),
        }
    }

    async fn push_check_in(&self, job: &JobRecord) -> AdapterResult<String> {
        let url = self.profile.url(&self.profile.endpoints.jobs);
        let body = self
            .send(Method::POST, url, Some(job_payload(job)), None)
            .await?;
        super::extract_id(&body)
    }
}
