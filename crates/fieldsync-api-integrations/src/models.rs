//! Request and response models for the integrations API.

use chrono::{DateTime, Utc};
use fieldsync_connector::ProviderCredentials;
use fieldsync_sync::{
    ItemError, MatchStrategy, RunStatus, SyncRun, SyncSettings, SyncSettingsUpdate,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Credentials submitted when configuring an integration.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsRequest {
    #[serde(rename = "oauth2")]
    OAuth2 {
        client_id: String,
        client_secret: String,
        tenant_id: String,
    },
    ApiKey {
        api_key: String,
    },
}

impl From<CredentialsRequest> for ProviderCredentials {
    fn from(req: CredentialsRequest) -> Self {
        match req {
            CredentialsRequest::OAuth2 {
                client_id,
                client_secret,
                tenant_id,
            } => ProviderCredentials::oauth2(client_id, client_secret, tenant_id),
            CredentialsRequest::ApiKey { api_key } => ProviderCredentials::api_key(api_key),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigureResponse {
    pub provider: String,
    pub configured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestConnectionResponse {
    pub ok: bool,
    pub message: String,
}

/// Effective sync settings for a pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncSettingsResponse {
    pub sync_customers: bool,
    pub create_new_customers: bool,
    pub update_existing_customers: bool,
    pub sync_checkins_as_jobs: bool,
    pub sync_photos: bool,
    #[schema(value_type = String)]
    pub customer_match_strategy: MatchStrategy,
}

impl From<SyncSettings> for SyncSettingsResponse {
    fn from(s: SyncSettings) -> Self {
        Self {
            sync_customers: s.sync_customers,
            create_new_customers: s.create_new_customers,
            update_existing_customers: s.update_existing_customers,
            sync_checkins_as_jobs: s.sync_checkins_as_jobs,
            sync_photos: s.sync_photos,
            customer_match_strategy: s.customer_match_strategy,
        }
    }
}

/// Partial settings update; omitted fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub sync_customers: Option<bool>,
    pub create_new_customers: Option<bool>,
    pub update_existing_customers: Option<bool>,
    pub sync_checkins_as_jobs: Option<bool>,
    pub sync_photos: Option<bool>,
    #[schema(value_type = Option<String>)]
    pub customer_match_strategy: Option<MatchStrategy>,
}

impl From<UpdateSettingsRequest> for SyncSettingsUpdate {
    fn from(req: UpdateSettingsRequest) -> Self {
        Self {
            sync_customers: req.sync_customers,
            create_new_customers: req.create_new_customers,
            update_existing_customers: req.update_existing_customers,
            sync_checkins_as_jobs: req.sync_checkins_as_jobs,
            sync_photos: req.sync_photos,
            customer_match_strategy: req.customer_match_strategy,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerSyncResponse {
    pub accepted: bool,
    pub run_id: Uuid,
}

/// Listing status of one provider for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    /// Configured; last run (if any) did not fail.
    Active,
    /// Configured, but the most recent run failed.
    Error,
    /// No credentials configured.
    Inactive,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IntegrationSummary {
    pub provider: String,
    pub display_name: String,
    pub status: IntegrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct HistoryQuery {
    /// Maximum runs to return (default 20, at most 100).
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(20)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,
    pub message: String,
}

impl From<ItemError> for ItemErrorResponse {
    fn from(e: ItemError) -> Self {
        Self {
            item_id: e.item_id,
            message: e.message,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunResponse {
    pub id: Uuid,
    pub provider: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[schema(value_type = String)]
    pub status: RunStatus,
    pub items_processed: u64,
    pub error_count: u64,
    pub errors: Vec<ItemErrorResponse>,
}

impl From<SyncRun> for RunResponse {
    fn from(run: SyncRun) -> Self {
        Self {
            id: run.id.as_uuid(),
            provider: run.provider,
            started_at: run.started_at,
            finished_at: run.finished_at,
            status: run.status,
            items_processed: run.items_processed,
            error_count: run.error_count,
            errors: run.errors.into_iter().map(Into::into).collect(),
        }
    }
}
