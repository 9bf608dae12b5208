//! Check-in input model supplied by the field-service subsystem.

use chrono::{DateTime, Utc};
use fieldsync_connector::{CheckInId, CompanyId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity fields used to match a local customer against the remote
/// system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerIdentity {
    /// Local customer id in the record-management subsystem.
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A technician check-in eligible for synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub company_id: CompanyId,
    pub customer: CustomerIdentity,
    pub job_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Photo URLs attached to the check-in.
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    /// Convert to the wire record pushed to a provider.
    ///
    /// Photos are dropped when photo sync is disabled for the pair.
    pub fn to_job_record(
        &self,
        remote_customer_id: Option<String>,
        include_photos: bool,
    ) -> fieldsync_connector::JobRecord {
        fieldsync_connector::JobRecord {
            check_in_id: self.id,
            remote_customer_id,
            job_type: self.job_type.clone(),
            notes: self.notes.clone(),
            location: self.location.clone(),
            photos: if include_photos {
                self.photos.clone()
            } else {
                Vec::new()
            },
            occurred_at: self.created_at,
        }
    }

    /// Convert the customer identity to the wire record.
    pub fn customer_record(&self) -> fieldsync_connector::CustomerRecord {
        fieldsync_connector::CustomerRecord {
            local_id: self.customer.id,
            name: self.customer.name.clone(),
            email: self.customer.email.clone(),
            phone: self.customer.phone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_in() -> CheckIn {
        CheckIn {
            id: CheckInId::new(),
            company_id: CompanyId::new(),
            customer: CustomerIdentity {
                id: Uuid::new_v4(),
                name: "Jane Doe".to_string(),
                email: Some("jane@example.com".to_string()),
                phone: None,
            },
            job_type: "hvac_repair".to_string(),
            notes: Some("replaced filter".to_string()),
            location: None,
            photos: vec!["https://cdn.example/p1.jpg".to_string()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_job_record_photo_toggle() {
        let ci = check_in();

        let with = ci.to_job_record(Some("rc-1".to_string()), true);
        assert_eq!(with.photos.len(), 1);
        assert_eq!(with.remote_customer_id.as_deref(), Some("rc-1"));

        let without = ci.to_job_record(None, false);
        assert!(without.photos.is_empty());
    }

    #[test]
    fn test_customer_record_carries_identity() {
        let ci = check_in();
        let record = ci.customer_record();
        assert_eq!(record.local_id, ci.customer.id);
        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
    }
}
