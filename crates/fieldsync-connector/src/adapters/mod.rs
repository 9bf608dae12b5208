//! Built-in HTTP provider adapters.
//!
//! Two variants cover the supported authentication models:
//! [`OAuth2Adapter`] (client-credentials with a cached bearer token) and
//! [`ApiKeyAdapter`] (static bearer key, no token lifecycle).

pub mod api_key;
pub mod oauth2;

pub use api_key::ApiKeyAdapter;
pub use oauth2::OAuth2Adapter;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::credentials::{AuthKind, ProviderCredentials};
use crate::error::{AdapterError, AdapterResult};
use crate::profile::{HttpSettings, ProviderProfile};
use crate::token::TokenCache;
use crate::traits::{AdapterFactory, BoxedAdapter};
use crate::types::{CustomerRecord, JobRecord, RemoteCustomer};

/// Factory producing the built-in HTTP adapters.
///
/// Holds the process-wide token cache so OAuth2 adapters built for the
/// same credential set share tokens.
#[derive(Debug, Default)]
pub struct HttpAdapterFactory {
    tokens: Arc<TokenCache>,
}

impl HttpAdapterFactory {
    /// Create a factory with its own token cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn build(
        &self,
        profile: &ProviderProfile,
        credentials: &ProviderCredentials,
    ) -> AdapterResult<BoxedAdapter> {
        match profile.auth_kind {
            AuthKind::OAuth2 => Ok(Arc::new(OAuth2Adapter::new(
                profile.clone(),
                credentials,
                self.tokens.clone(),
            )?)),
            AuthKind::ApiKey => Ok(Arc::new(ApiKeyAdapter::new(profile.clone(), credentials)?)),
        }
    }
}

/// Build a reqwest client with the profile's bounded timeouts.
pub(crate) fn build_client(http: &HttpSettings) -> AdapterResult<Client> {
    Client::builder()
        .timeout(http.request_timeout())
        .connect_timeout(http.connect_timeout())
        .build()
        .map_err(|e| AdapterError::Validation {
            message: format!("failed to build HTTP client: {e}"),
        })
}

/// Map a reqwest transport error to the adapter taxonomy.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> AdapterError {
    if err.is_timeout() {
        AdapterError::Timeout {
            timeout_secs: timeout.as_secs(),
        }
    } else if err.is_connect() {
        AdapterError::connection_failed_with_source("could not reach provider", err)
    } else {
        AdapterError::network_with_source("request failed", err)
    }
}

/// Map a non-success HTTP status to the adapter taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str) -> AdapterError {
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterError::auth_failed(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AdapterError::RemoteValidation { message }
        }
        StatusCode::REQUEST_TIMEOUT => AdapterError::Timeout { timeout_secs: 0 },
        StatusCode::TOO_MANY_REQUESTS => AdapterError::ProviderUnavailable { message },
        s if s.is_server_error() => AdapterError::ProviderUnavailable { message },
        _ => AdapterError::RemoteValidation { message },
    }
}

/// Pull the remote id out of a provider response body.
///
/// Accepts `{"id": ...}` at the top level or under `"data"`; ids may be
/// strings or numbers.
pub(crate) fn extract_id(body: &Value) -> AdapterResult<String> {
    let candidate = body
        .get("id")
        .or_else(|| body.get("data").and_then(|d| d.get("id")));

    match candidate {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(AdapterError::malformed_response(
            "response is missing an id field",
        )),
    }
}

/// Parse a customer search response into remote customers.
///
/// Accepts a bare JSON array or an object with a `data` array.
pub(crate) fn parse_customers(body: &Value) -> AdapterResult<Vec<RemoteCustomer>> {
    let items = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => body
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AdapterError::malformed_response("expected an array of customers")
            })?,
        _ => {
            return Err(AdapterError::malformed_response(
                "expected an array of customers",
            ))
        }
    };

    items
        .iter()
        .map(|item| {
            Ok(RemoteCustomer {
                id: extract_id(item)?,
                name: item.get("name").and_then(Value::as_str).map(String::from),
                email: item.get("email").and_then(Value::as_str).map(String::from),
                phone: item.get("phone").and_then(Value::as_str).map(String::from),
            })
        })
        .collect()
}

/// Customer create/update payload in the generic wire convention.
pub(crate) fn customer_payload(customer: &CustomerRecord) -> Value {
    json!({
        "name": customer.name,
        "email": customer.email,
        "phone": customer.phone,
        "external_ref": customer.local_id,
    })
}

/// Job payload in the generic wire convention.
pub(crate) fn job_payload(job: &JobRecord) -> Value {
    json!({
        "customer_id": job.remote_customer_id,
        "job_type": job.job_type,
        "notes": job.notes,
        "location": job.location,
        "photos": job.photos,
        "occurred_at": job.occurred_at,
        "external_ref": job.check_in_id,
    })
}
