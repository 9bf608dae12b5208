//! In-memory storage for tests and embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use fieldsync_connector::{CompanyId, RunId};

use crate::checkin::CheckIn;
use crate::error::{SyncError, SyncResult};
use crate::mapping::{MappedEntity, RemoteMapping};
use crate::run::SyncRun;
use crate::settings::SyncSettings;

use super::{
    CheckInSource, CredentialStore, HistoryStore, MappingStore, SettingsStore, StoredCredential,
};

type PairKey = (CompanyId, String);
type MappingKey = (CompanyId, String, MappedEntity, Uuid);

/// All stores backed by `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<PairKey, StoredCredential>>,
    settings: RwLock<HashMap<PairKey, SyncSettings>>,
    mappings: RwLock<HashMap<MappingKey, RemoteMapping>>,
    runs: RwLock<Vec<SyncRun>>,
    check_ins: RwLock<Vec<CheckIn>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a check-in awaiting synchronization.
    pub fn add_check_in(&self, check_in: CheckIn) {
        self.check_ins
            .write()
            .expect("check-in lock poisoned")
            .push(check_in);
    }

    fn pair(company_id: CompanyId, provider: &str) -> PairKey {
        (company_id, provider.to_string())
    }

    fn lock_err() -> SyncError {
        SyncError::internal("store lock poisoned")
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn put_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
        credential: StoredCredential,
    ) -> SyncResult<()> {
        self.credentials
            .write()
            .map_err(|_| Self::lock_err())?
            .insert(Self::pair(company_id, provider), credential);
        Ok(())
    }

    async fn get_credential(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<StoredCredential>> {
        Ok(self
            .credentials
            .read()
            .map_err(|_| Self::lock_err())?
            .get(&Self::pair(company_id, provider))
            .cloned())
    }

    async fn delete_credential(&self, company_id: CompanyId, provider: &str) -> SyncResult<bool> {
        Ok(self
            .credentials
            .write()
            .map_err(|_| Self::lock_err())?
            .remove(&Self::pair(company_id, provider))
            .is_some())
    }

    async fn configured_providers(&self, company_id: CompanyId) -> SyncResult<Vec<String>> {
        let mut providers: Vec<String> = self
            .credentials
            .read()
            .map_err(|_| Self::lock_err())?
            .keys()
            .filter(|(company, _)| *company == company_id)
            .map(|(_, provider)| provider.clone())
            .collect();
        providers.sort_unstable();
        Ok(providers)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn put_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
        settings: &SyncSettings,
    ) -> SyncResult<()> {
        self.settings
            .write()
            .map_err(|_| Self::lock_err())?
            .insert(Self::pair(company_id, provider), settings.clone());
        Ok(())
    }

    async fn get_settings(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<SyncSettings>> {
        Ok(self
            .settings
            .read()
            .map_err(|_| Self::lock_err())?
            .get(&Self::pair(company_id, provider))
            .cloned())
    }

    async fn delete_settings(&self, company_id: CompanyId, provider: &str) -> SyncResult<()> {
        self.settings
            .write()
            .map_err(|_| Self::lock_err())?
            .remove(&Self::pair(company_id, provider));
        Ok(())
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn get_mapping(
        &self,
        company_id: CompanyId,
        provider: &str,
        entity_type: MappedEntity,
        local_id: Uuid,
    ) -> SyncResult<Option<RemoteMapping>> {
        Ok(self
            .mappings
            .read()
            .map_err(|_| Self::lock_err())?
            .get(&(company_id, provider.to_string(), entity_type, local_id))
            .cloned())
    }

    async fn upsert_mapping(&self, mapping: RemoteMapping) -> SyncResult<()> {
        let key = (
            mapping.company_id,
            mapping.provider.clone(),
            mapping.entity_type,
            mapping.local_id,
        );
        self.mappings
            .write()
            .map_err(|_| Self::lock_err())?
            .insert(key, mapping);
        Ok(())
    }

    async fn purge_mappings(&self, company_id: CompanyId, provider: &str) -> SyncResult<u64> {
        let mut mappings = self.mappings.write().map_err(|_| Self::lock_err())?;
        let before = mappings.len();
        mappings.retain(|(company, prov, _, _), _| {
            !(*company == company_id && prov == provider)
        });
        Ok((before - mappings.len()) as u64)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn insert_run(&self, run: &SyncRun) -> SyncResult<()> {
        self.runs
            .write()
            .map_err(|_| Self::lock_err())?
            .push(run.clone());
        Ok(())
    }

    async fn finalize_run(&self, run: &SyncRun) -> SyncResult<()> {
        let mut runs = self.runs.write().map_err(|_| Self::lock_err())?;
        match runs.iter_mut().find(|r| r.id == run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(())
            }
            None => Err(SyncError::storage(format!("unknown run {}", run.id))),
        }
    }

    async fn get_run(&self, company_id: CompanyId, run_id: RunId) -> SyncResult<Option<SyncRun>> {
        Ok(self
            .runs
            .read()
            .map_err(|_| Self::lock_err())?
            .iter()
            .find(|r| r.id == run_id && r.company_id == company_id)
            .cloned())
    }

    async fn list_runs(
        &self,
        company_id: CompanyId,
        provider: &str,
        limit: u32,
    ) -> SyncResult<Vec<SyncRun>> {
        let runs = self.runs.read().map_err(|_| Self::lock_err())?;
        let mut matching: Vec<SyncRun> = runs
            .iter()
            .filter(|r| r.company_id == company_id && r.provider == provider)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn last_synced_at(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self
            .runs
            .read()
            .map_err(|_| Self::lock_err())?
            .iter()
            .filter(|r| r.company_id == company_id && r.provider == provider)
            .filter_map(|r| r.finished_at)
            .max())
    }
}

#[async_trait]
impl CheckInSource for MemoryStore {
    async fn pending_check_ins(&self, company_id: CompanyId) -> SyncResult<Vec<CheckIn>> {
        Ok(self
            .check_ins
            .read()
            .map_err(|_| Self::lock_err())?
            .iter()
            .filter(|ci| ci.company_id == company_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credential_lifecycle() {
        let store = MemoryStore::new();
        let company = CompanyId::new();

        assert!(store
            .get_credential(company, "orbit_crm")
            .await
            .unwrap()
            .is_none());

        store
            .put_credential(
                company,
                "orbit_crm",
                StoredCredential {
                    blob: vec![1, 2, 3],
                    configured_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let stored = store
            .get_credential(company, "orbit_crm")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.blob, vec![1, 2, 3]);

        assert_eq!(
            store.configured_providers(company).await.unwrap(),
            vec!["orbit_crm"]
        );

        assert!(store.delete_credential(company, "orbit_crm").await.unwrap());
        assert!(!store.delete_credential(company, "orbit_crm").await.unwrap());
    }

    #[tokio::test]
    async fn test_mapping_upsert_replaces() {
        let store = MemoryStore::new();
        let company = CompanyId::new();
        let local = Uuid::new_v4();

        store
            .upsert_mapping(RemoteMapping::new(
                company,
                "orbit_crm",
                MappedEntity::Customer,
                local,
                "rc-1",
            ))
            .await
            .unwrap();
        store
            .upsert_mapping(RemoteMapping::new(
                company,
                "orbit_crm",
                MappedEntity::Customer,
                local,
                "rc-2",
            ))
            .await
            .unwrap();

        let mapping = store
            .get_mapping(company, "orbit_crm", MappedEntity::Customer, local)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.remote_id, "rc-2");
    }

    #[tokio::test]
    async fn test_purge_scoped_to_pair() {
        let store = MemoryStore::new();
        let company = CompanyId::new();
        let other = CompanyId::new();

        for (c, p) in [(company, "a_crm"), (company, "b_crm"), (other, "a_crm")] {
            store
                .upsert_mapping(RemoteMapping::new(
                    c,
                    p,
                    MappedEntity::Checkin,
                    Uuid::new_v4(),
                    "r",
                ))
                .await
                .unwrap();
        }

        assert_eq!(store.purge_mappings(company, "a_crm").await.unwrap(), 1);
        assert!(store
            .get_mapping(other, "a_crm", MappedEntity::Checkin, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_run_history_ordering_and_limit() {
        let store = MemoryStore::new();
        let company = CompanyId::new();

        for _ in 0..3 {
            let run = SyncRun::start(company, "orbit_crm").finalize(1, vec![]);
            store.insert_run(&run).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let runs = store.list_runs(company, "orbit_crm", 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].started_at >= runs[1].started_at);

        assert!(store
            .last_synced_at(company, "orbit_crm")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_finalize_unknown_run_errors() {
        let store = MemoryStore::new();
        let run = SyncRun::start(CompanyId::new(), "orbit_crm");
        assert!(store.finalize_run(&run).await.is_err());
    }
}
