//! Records exchanged with provider adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::CheckInId;

/// Customer payload pushed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Local customer id in the record-management subsystem.
    pub local_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Check-in payload pushed to a provider as a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub check_in_id: CheckInId,
    /// Remote customer to attach the job to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_customer_id: Option<String>,
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Photo URLs; empty when photo sync is disabled.
    #[serde(default)]
    pub photos: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// A customer as known by the remote system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCustomer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Lookup query for remote customer search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerQuery {
    /// Exact email (callers pass it lowercased).
    Email(String),
    /// Digits-only phone number.
    Phone(String),
    /// Exact full name (callers pass it lowercased).
    Name(String),
}

impl CustomerQuery {
    /// Query parameter name on the provider's search endpoint.
    pub fn param(&self) -> &'static str {
        match self {
            CustomerQuery::Email(_) => "email",
            CustomerQuery::Phone(_) => "phone",
            CustomerQuery::Name(_) => "name",
        }
    }

    /// Query value.
    pub fn value(&self) -> &str {
        match self {
            CustomerQuery::Email(v) | CustomerQuery::Phone(v) | CustomerQuery::Name(v) => v,
        }
    }
}

/// Outcome of a connectivity probe.
///
/// Probes never fail with an error; failures fold into `ok = false` with a
/// human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub ok: bool,
    pub detail: String,
}

impl TestOutcome {
    /// Successful probe.
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    /// Failed probe with a reason.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_query_params() {
        assert_eq!(CustomerQuery::Email("a@b.c".into()).param(), "email");
        assert_eq!(CustomerQuery::Phone("5551234".into()).param(), "phone");
        assert_eq!(CustomerQuery::Name("jane doe".into()).value(), "jane doe");
    }

    #[test]
    fn test_job_record_serialization_skips_empty() {
        let job = JobRecord {
            check_in_id: CheckInId::new(),
            remote_customer_id: None,
            job_type: "hvac_repair".to_string(),
            notes: None,
            location: None,
            photos: vec![],
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert!(json.get("remote_customer_id").is_none());
        assert!(json.get("notes").is_none());
    }
}
