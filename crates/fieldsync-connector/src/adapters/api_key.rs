//! Static API-key adapter.

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::credentials::{AuthKind, ProviderCredentials};
use crate::error::{AdapterError, AdapterResult};
use crate::profile::{EndpointPaths, ProviderProfile};
use crate::traits::ProviderAdapter;
use crate::types::{CustomerQuery, CustomerRecord, JobRecord, RemoteCustomer, TestOutcome};

use super::{
    build_client, customer_payload, job_payload, parse_customers, status_error, transport_error,
};

/// Adapter for providers authenticated with a static API key.
///
/// The key is attached to every request, either as `Authorization: Bearer`
/// or in the header the profile names. There is no token lifecycle.
pub struct ApiKeyAdapter {
    profile: ProviderProfile,
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for ApiKeyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAdapter")
            .field("provider", &self.profile.key)
            .field("api_key", &"***REDACTED***")
            .finish()
    }
}

impl ApiKeyAdapter {
    /// Create an adapter from a profile and API-key credentials.
    pub fn new(profile: ProviderProfile, credentials: &ProviderCredentials) -> AdapterResult<Self> {
        profile.validate()?;
        credentials.validate_for(AuthKind::ApiKey)?;

        let ProviderCredentials::ApiKey { api_key } = credentials else {
            unreachable!("validate_for checked the variant");
        };

        let client = build_client(&profile.http)?;
        Ok(Self {
            profile,
            api_key: api_key.clone(),
            client,
        })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.profile.api_key_header {
            Some(name) => builder.header(name, &self.api_key),
            None => builder.header(header::AUTHORIZATION, format!("Bearer {}", self.api_key)),
        }
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
        query: Option<(&str, &str)>,
    ) -> AdapterResult<Value> {
        let mut builder = self.request(method.clone(), &url);
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
        serde_json::from_str(&text)
            .map_err(|e| AdapterError::malformed_response(format!("invalid JSON: {e}")))
    }
}

#[async_trait]
impl ProviderAdapter for ApiKeyAdapter {
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
            // Some providers return an empty body on update.
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

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile(base_url: &str) -> ProviderProfile {
        ProviderProfile::new("acme_fsm", "Acme FSM", AuthKind::ApiKey, base_url)
    }

    fn adapter(base_url: &str) -> ApiKeyAdapter {
        ApiKeyAdapter::new(profile(base_url), &ProviderCredentials::api_key("abc123")).unwrap()
    }

    #[tokio::test]
    async fn test_connection_ok_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri()).test_connection().await;
        assert!(outcome.ok, "{}", outcome.detail);
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let outcome = adapter(&server.uri()).test_connection().await;
        assert!(!outcome.ok);
        assert!(outcome.detail.contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_custom_header_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("X-Api-Key", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let adapter = ApiKeyAdapter::new(
            profile(&server.uri()).with_api_key_header("X-Api-Key"),
            &ProviderCredentials::api_key("abc123"),
        )
        .unwrap();
        assert!(adapter.test_connection().await.ok);
    }

    #[tokio::test]
    async fn test_find_customer_by_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers"))
            .and(query_param("email", "jane@x.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "rc-1", "email": "jane@x.com", "name": "Jane"}
            ])))
            .mount(&server)
            .await;

        let found = adapter(&server.uri())
            .find_customer(&CustomerQuery::Email("jane@x.com".to_string()))
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "rc-1");
    }

    #[tokio::test]
    async fn test_find_customer_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let found = adapter(&server.uri())
            .find_customer(&CustomerQuery::Phone("5551234".to_string()))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_customer_returns_remote_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customers"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "rc-9"})),
            )
            .mount(&server)
            .await;

        let record = CustomerRecord {
            local_id: Uuid::new_v4(),
            name: "Jane Doe".to_string(),
            email: Some("jane@x.com".to_string()),
            phone: None,
        };
        let id = adapter(&server.uri()).create_customer(&record).await.unwrap();
        assert_eq!(id, "rc-9");
    }

    #[tokio::test]
    async fn test_server_error_maps_to_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let job = JobRecord {
            check_in_id: crate::ids::CheckInId::new(),
            remote_customer_id: None,
            job_type: "repair".to_string(),
            notes: None,
            location: None,
            photos: vec![],
            occurred_at: chrono::Utc::now(),
        };
        let err = adapter(&server.uri()).push_check_in(&job).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_update_with_empty_body_keeps_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/customers/rc-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let record = CustomerRecord {
            local_id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: None,
            phone: None,
        };
        let id = adapter(&server.uri())
            .update_customer("rc-1", &record)
            .await
            .unwrap();
        assert_eq!(id, "rc-1");
    }
}
