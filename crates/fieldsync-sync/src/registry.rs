//! Per-pair sync settings registry.

use std::sync::Arc;

use fieldsync_connector::CompanyId;
use tracing::info;

use crate::error::SyncResult;
use crate::settings::{SyncSettings, SyncSettingsUpdate};
use crate::store::SettingsStore;

/// Read/merge surface over stored sync settings.
///
/// A pair that was never customized behaves exactly like one with the
/// default row stored; callers never observe "no settings".
pub struct ConfigurationRegistry<S> {
    store: Arc<S>,
}

impl<S: SettingsStore> ConfigurationRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Effective settings for a pair: stored or default.
    pub async fn get(&self, company_id: CompanyId, provider: &str) -> SyncResult<SyncSettings> {
        Ok(self
            .store
            .get_settings(company_id, provider)
            .await?
            .unwrap_or_default())
    }

    /// Merge a partial update over the effective settings and store the
    /// result. Returns the merged settings.
    pub async fn update(
        &self,
        company_id: CompanyId,
        provider: &str,
        update: &SyncSettingsUpdate,
    ) -> SyncResult<SyncSettings> {
        let merged = update.apply(&self.get(company_id, provider).await?);
        self.store
            .put_settings(company_id, provider, &merged)
            .await?;
        info!(%company_id, provider, "sync settings updated");
        Ok(merged)
    }
}

impl<S> Clone for ConfigurationRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> std::fmt::Debug for ConfigurationRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationRegistry").finish_non_exhaustive()
    }
}
