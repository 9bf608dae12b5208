//! Local-to-remote identifier mappings.

use chrono::{DateTime, Utc};
use fieldsync_connector::CompanyId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity kinds tracked in the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappedEntity {
    Customer,
    Checkin,
}

impl MappedEntity {
    /// Stable string used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MappedEntity::Customer => "customer",
            MappedEntity::Checkin => "checkin",
        }
    }

    /// Parse from the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(MappedEntity::Customer),
            "checkin" => Some(MappedEntity::Checkin),
            _ => None,
        }
    }
}

impl std::fmt::Display for MappedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One local-to-remote id mapping.
///
/// At most one mapping exists per `(company_id, provider, entity_type,
/// local_id)`; re-upserting replaces the remote id. Mappings persist
/// across runs and survive integration removal, which is what makes
/// repeat syncs idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMapping {
    pub company_id: CompanyId,
    pub provider: String,
    pub entity_type: MappedEntity,
    pub local_id: Uuid,
    pub remote_id: String,
    pub mapped_at: DateTime<Utc>,
}

impl RemoteMapping {
    /// Create a mapping stamped now.
    pub fn new(
        company_id: CompanyId,
        provider: impl Into<String>,
        entity_type: MappedEntity,
        local_id: Uuid,
        remote_id: impl Into<String>,
    ) -> Self {
        Self {
            company_id,
            provider: provider.into(),
            entity_type,
            local_id,
            remote_id: remote_id.into(),
            mapped_at: Utc::now(),
        }
    }
}
