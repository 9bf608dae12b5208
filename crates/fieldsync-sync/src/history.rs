//! Run history ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fieldsync_connector::{CompanyId, RunId};
use tracing::info;

use crate::error::SyncResult;
use crate::run::SyncRun;
use crate::store::HistoryStore;

/// Append-only view over the run history store.
///
/// Runs are recorded when they start and finalized exactly once; finalized
/// runs are never mutated again.
pub struct SyncHistoryLedger<S> {
    store: Arc<S>,
}

impl<S: HistoryStore> SyncHistoryLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record a newly started run.
    pub async fn record_start(&self, run: &SyncRun) -> SyncResult<()> {
        self.store.insert_run(run).await
    }

    /// Record the final state of a run.
    pub async fn record_finish(&self, run: &SyncRun) -> SyncResult<()> {
        self.store.finalize_run(run).await?;
        info!(
            run_id = %run.id,
            company_id = %run.company_id,
            provider = %run.provider,
            status = %run.status,
            items_processed = run.items_processed,
            error_count = run.error_count,
            "sync run finished"
        );
        Ok(())
    }

    /// Fetch one run, company-scoped.
    pub async fn run(&self, company_id: CompanyId, run_id: RunId) -> SyncResult<Option<SyncRun>> {
        self.store.get_run(company_id, run_id).await
    }

    /// Runs for a pair, most recent first.
    pub async fn list(
        &self,
        company_id: CompanyId,
        provider: &str,
        limit: u32,
    ) -> SyncResult<Vec<SyncRun>> {
        self.store.list_runs(company_id, provider, limit).await
    }

    /// Finish time of the most recent run for a pair.
    pub async fn last_synced_at(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<DateTime<Utc>>> {
        self.store.last_synced_at(company_id, provider).await
    }
}

impl<S> Clone for SyncHistoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> std::fmt::Debug for SyncHistoryLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHistoryLedger").finish_non_exhaustive()
    }
}
