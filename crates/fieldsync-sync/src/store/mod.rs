//! Pluggable storage for the sync engine.
//!
//! Production runs against Postgres ([`PgStore`]); tests and embedding use
//! the in-memory implementation ([`MemoryStore`]). The traits are the only
//! surface the engine sees.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldsync_connector::{CompanyId, RunId};
use uuid::Uuid;

use crate::checkin::CheckIn;
use crate::error::SyncResult;
use crate::mapping::{MappedEntity, RemoteMapping};
use crate::run::SyncRun;
use crate::settings::SyncSettings;

/// An encrypted credential blob at rest.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub blob: Vec<u8>,
    pub configured_at: DateTime<Utc>,
}

/// Persistence for encrypted provider credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or replace the credential for a (company, provider) pair.
    async fn put_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
        credential: StoredCredential,
    ) -> SyncResult<()>;

    /// Fetch the credential blob, if configured.
    async fn get_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<StoredCredential>>;

    /// Delete the credential. Returns whether a row existed.
    async fn delete_credential(&self, company_id: CompanyId, provider: &str) -> SyncResult<bool>;

    /// Providers with a configured credential for this company.
    async fn configured_providers(&self, company_id: CompanyId) -> SyncResult<Vec<String>>;
}

/// Persistence for per-pair sync settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn put_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
        settings: &SyncSettings,
    ) -> SyncResult<()>;

    /// Stored settings, or None when the pair has never been customized.
    async fn get_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<SyncSettings>>;

    async fn delete_settings(&self, company_id: CompanyId, provider: &str) -> SyncResult<()>;
}

/// Persistence for local-to-remote id mappings.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Look up the mapping for one local entity.
    async fn get_mapping(
        &self,
        company_id: CompanyId,
        provider: &str,
        entity_type: MappedEntity,
        local_id: Uuid,
    ) -> SyncResult<Option<RemoteMapping>>;

    /// Insert or replace a mapping; at most one row per
    /// (company, provider, entity_type, local_id).
    async fn upsert_mapping(&self, mapping: RemoteMapping) -> SyncResult<()>;

    /// Remove every mapping for a (company, provider) pair. Operator
    /// escape hatch; integration removal does not call this.
    async fn purge_mappings(&self, company_id: CompanyId, provider: &str) -> SyncResult<u64>;
}

/// Persistence for sync run history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a newly started run.
    async fn insert_run(&self, run: &SyncRun) -> SyncResult<()>;

    /// Persist the finalized state of a run.
    async fn finalize_run(&self, run: &SyncRun) -> SyncResult<()>;

    /// Fetch a single run.
    async fn get_run(&self, company_id: CompanyId, run_id: RunId) -> SyncResult<Option<SyncRun>>;

    /// Runs for a (company, provider) pair, most recent first.
    async fn list_runs(
        &self,
        company_id: CompanyId,
        provider: &str,
        limit: u32,
    ) -> SyncResult<Vec<SyncRun>>;

    /// Finish time of the most recent finalized run for the pair.
    async fn last_synced_at(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<DateTime<Utc>>>;
}

/// Source of check-ins awaiting synchronization.
///
/// Supplied by the field-service subsystem; the engine filters out
/// check-ins that already carry a mapping.
#[async_trait]
pub trait CheckInSource: Send + Sync {
    async fn pending_check_ins(&self, company_id: CompanyId) -> SyncResult<Vec<CheckIn>>;
}
