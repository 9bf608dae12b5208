//! Postgres storage backend.
//!
//! Runtime-bound queries only; schema lives in `migrations/`. The mapping
//! upsert relies on the unique index over
//! `(company_id, provider, entity_type, local_id)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use fieldsync_connector::{CompanyId, RunId};

use crate::checkin::{CheckIn, CustomerIdentity};
use crate::error::{SyncError, SyncResult};
use crate::mapping::{MappedEntity, RemoteMapping};
use crate::run::{ItemError, RunStatus, SyncRun};
use crate::settings::SyncSettings;

use super::{
    CheckInSource, CredentialStore, HistoryStore, MappingStore, SettingsStore, StoredCredential,
};

/// All stores backed by a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn run_status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Success => "success",
        RunStatus::Partial => "partial",
        RunStatus::Failed => "failed",
    }
}

fn parse_run_status(s: &str) -> SyncResult<RunStatus> {
    match s {
        "running" => Ok(RunStatus::Running),
        "success" => Ok(RunStatus::Success),
        "partial" => Ok(RunStatus::Partial),
        "failed" => Ok(RunStatus::Failed),
        other => Err(SyncError::storage(format!("unknown run status: {other}"))),
    }
}

fn row_to_run(row: &PgRow) -> SyncResult<SyncRun> {
    let status: String = row.try_get("status")?;
    let errors: serde_json::Value = row.try_get("errors")?;
    let errors: Vec<ItemError> = serde_json::from_value(errors)
        .map_err(|e| SyncError::storage(format!("malformed run errors column: {e}")))?;

    Ok(SyncRun {
        id: RunId::from_uuid(row.try_get("id")?),
        company_id: CompanyId::from_uuid(row.try_get("company_id")?),
        provider: row.try_get("provider")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        status: parse_run_status(&status)?,
        items_processed: row.try_get::<i64, _>("items_processed")? as u64,
        error_count: row.try_get::<i64, _>("error_count")? as u64,
        errors,
    })
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn put_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
        credential: StoredCredential,
    ) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO integration_credentials (company_id, provider, blob, configured_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id, provider)
            DO UPDATE SET blob = EXCLUDED.blob, configured_at = EXCLUDED.configured_at
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .bind(&credential.blob)
        .bind(credential.configured_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<StoredCredential>> {
        let row = sqlx::query(
            r#"
            SELECT blob, configured_at
            FROM integration_credentials
            WHERE company_id = $1 AND provider = $2
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(StoredCredential {
                blob: row.try_get("blob")?,
                configured_at: row.try_get("configured_at")?,
            })
        })
        .transpose()
    }

    async fn delete_credential(&self, company_id: CompanyId, provider: &str) -> SyncResult<bool> {
        let result = sqlx::query(
            "DELETE FROM integration_credentials WHERE company_id = $1 AND provider = $2",
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn configured_providers(&self, company_id: CompanyId) -> SyncResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT provider FROM integration_credentials WHERE company_id = $1 ORDER BY provider",
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(row.try_get("provider")?))
            .collect()
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn put_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
        settings: &SyncSettings,
    ) -> SyncResult<()> {
        let settings = serde_json::to_value(settings)
            .map_err(|e| SyncError::storage(format!("failed to serialize settings: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO integration_settings (company_id, provider, settings, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (company_id, provider)
            DO UPDATE SET settings = EXCLUDED.settings, updated_at = NOW()
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .bind(settings)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<SyncSettings>> {
        let row = sqlx::query(
            "SELECT settings FROM integration_settings WHERE company_id = $1 AND provider = $2",
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let value: serde_json::Value = row.try_get("settings")?;
            serde_json::from_value(value)
                .map_err(|e| SyncError::storage(format!("malformed settings column: {e}")))
        })
        .transpose()
    }

    async fn delete_settings(&self, company_id: CompanyId, provider: &str) -> SyncResult<()> {
        sqlx::query(
            "DELETE FROM integration_settings WHERE company_id = $1 AND provider = $2",
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MappingStore for PgStore {
    async fn get_mapping(
        &self,
        company_id: CompanyId,
        provider: &str,
        entity_type: MappedEntity,
        local_id: Uuid,
    ) -> SyncResult<Option<RemoteMapping>> {
        let row = sqlx::query(
            r#"
            SELECT remote_id, mapped_at
            FROM integration_mappings
            WHERE company_id = $1 AND provider = $2 AND entity_type = $3 AND local_id = $4
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .bind(entity_type.as_str())
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(RemoteMapping {
                company_id,
                provider: provider.to_string(),
                entity_type,
                local_id,
                remote_id: row.try_get("remote_id")?,
                mapped_at: row.try_get("mapped_at")?,
            })
        })
        .transpose()
    }

    async fn upsert_mapping(&self, mapping: RemoteMapping) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO integration_mappings
                (company_id, provider, entity_type, local_id, remote_id, mapped_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company_id, provider, entity_type, local_id)
            DO UPDATE SET remote_id = EXCLUDED.remote_id, mapped_at = EXCLUDED.mapped_at
            "#,
        )
        .bind(mapping.company_id.as_uuid())
        .bind(&mapping.provider)
        .bind(mapping.entity_type.as_str())
        .bind(mapping.local_id)
        .bind(&mapping.remote_id)
        .bind(mapping.mapped_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_mappings(&self, company_id: CompanyId, provider: &str) -> SyncResult<u64> {
        let result = sqlx::query(
            "DELETE FROM integration_mappings WHERE company_id = $1 AND provider = $2",
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn insert_run(&self, run: &SyncRun) -> SyncResult<()> {
        let errors = serde_json::to_value(&run.errors)
            .map_err(|e| SyncError::storage(format!("failed to serialize run errors: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO sync_runs
                (id, company_id, provider, started_at, finished_at, status,
                 items_processed, error_count, errors)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(run.id.as_uuid())
        .bind(run.company_id.as_uuid())
        .bind(&run.provider)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run_status_str(run.status))
        .bind(run.items_processed as i64)
        .bind(run.error_count as i64)
        .bind(errors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize_run(&self, run: &SyncRun) -> SyncResult<()> {
        let errors = serde_json::to_value(&run.errors)
            .map_err(|e| SyncError::storage(format!("failed to serialize run errors: {e}")))?;
        let result = sqlx::query(
            r#"
            UPDATE sync_runs
            SET finished_at = $2, status = $3, items_processed = $4,
                error_count = $5, errors = $6
            WHERE id = $1 AND finished_at IS NULL
            "#,
        )
        .bind(run.id.as_uuid())
        .bind(run.finished_at)
        .bind(run_status_str(run.status))
        .bind(run.items_processed as i64)
        .bind(run.error_count as i64)
        .bind(errors)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::storage(format!(
                "run {} missing or already finalized",
                run.id
            )));
        }
        Ok(())
    }

    async fn get_run(&self, company_id: CompanyId, run_id: RunId) -> SyncResult<Option<SyncRun>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, provider, started_at, finished_at, status,
                   items_processed, error_count, errors
            FROM sync_runs
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(run_id.as_uuid())
        .bind(company_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_run).transpose()
    }

    async fn list_runs(
        &self,
        company_id: CompanyId,
        provider: &str,
        limit: u32,
    ) -> SyncResult<Vec<SyncRun>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, provider, started_at, finished_at, status,
                   items_processed, error_count, errors
            FROM sync_runs
            WHERE company_id = $1 AND provider = $2
            ORDER BY started_at DESC
            LIMIT $3
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_run).collect()
    }

    async fn last_synced_at(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(finished_at) AS last_synced_at
            FROM sync_runs
            WHERE company_id = $1 AND provider = $2 AND finished_at IS NOT NULL
            "#,
        )
        .bind(company_id.as_uuid())
        .bind(provider)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("last_synced_at")?)
    }
}

#[async_trait]
impl CheckInSource for PgStore {
    async fn pending_check_ins(&self, company_id: CompanyId) -> SyncResult<Vec<CheckIn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, customer_id, customer_name, customer_email,
                   customer_phone, job_type, notes, location, photos, created_at
            FROM check_ins
            WHERE company_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CheckIn {
                    id: fieldsync_connector::CheckInId::from_uuid(row.try_get("id")?),
                    company_id: CompanyId::from_uuid(row.try_get("company_id")?),
                    customer: CustomerIdentity {
                        id: row.try_get("customer_id")?,
                        name: row.try_get("customer_name")?,
                        email: row.try_get("customer_email")?,
                        phone: row.try_get("customer_phone")?,
                    },
                    job_type: row.try_get("job_type")?,
                    notes: row.try_get("notes")?,
                    location: row.try_get("location")?,
                    photos: row.try_get("photos")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}
