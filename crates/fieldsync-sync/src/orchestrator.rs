//! Sync run orchestration.
//!
//! A trigger acquires the per-pair run lock, records the run, and returns
//! immediately; the run body executes in a spawned task. Item failures are
//! collected and never abort the run; the lock is released even when the
//! run body panics (the supervisor awaits the inner task's join handle).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use fieldsync_connector::{
    AdapterFactory, AdapterResult, BoxedAdapter, CompanyId, ProviderDirectory, RetryExecutor,
    RunId,
};

use crate::checkin::CheckIn;
use crate::error::{SyncError, SyncResult};
use crate::history::SyncHistoryLedger;
use crate::mapping::{MappedEntity, RemoteMapping};
use crate::matcher::CustomerMatcher;
use crate::registry::ConfigurationRegistry;
use crate::run::{ItemError, SyncRun};
use crate::settings::SyncSettings;
use crate::store::{
    CheckInSource, CredentialStore, HistoryStore, MappingStore, SettingsStore,
};
use crate::vault::CredentialVault;

/// Storage bundle the orchestrator requires.
pub trait SyncStore:
    CredentialStore + SettingsStore + MappingStore + HistoryStore + CheckInSource + 'static
{
}

impl<T> SyncStore for T where
    T: CredentialStore + SettingsStore + MappingStore + HistoryStore + CheckInSource + 'static
{
}

type PairKey = (CompanyId, String);

#[derive(Debug, Clone)]
struct RunHandle {
    run_id: RunId,
    cancel: Arc<AtomicBool>,
}

/// What happened to one check-in.
enum ItemOutcome {
    Synced,
    /// Not counted as processed (unmatched customer with creation off).
    Skipped,
}

/// Drives sync runs for every (company, provider) pair.
pub struct SyncOrchestrator<S> {
    vault: Arc<CredentialVault<S>>,
    registry: ConfigurationRegistry<S>,
    ledger: SyncHistoryLedger<S>,
    store: Arc<S>,
    directory: Arc<ProviderDirectory>,
    factory: Arc<dyn AdapterFactory>,
    matcher: CustomerMatcher,
    active: Mutex<HashMap<PairKey, RunHandle>>,
}

impl<S: SyncStore> SyncOrchestrator<S> {
    pub fn new(
        vault: Arc<CredentialVault<S>>,
        store: Arc<S>,
        directory: Arc<ProviderDirectory>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            vault,
            registry: ConfigurationRegistry::new(store.clone()),
            ledger: SyncHistoryLedger::new(store.clone()),
            store,
            directory,
            factory,
            matcher: CustomerMatcher,
            active: Mutex::new(HashMap::new()),
        })
    }

    /// The settings registry backing this orchestrator.
    pub fn registry(&self) -> &ConfigurationRegistry<S> {
        &self.registry
    }

    /// The run history ledger backing this orchestrator.
    pub fn ledger(&self) -> &SyncHistoryLedger<S> {
        &self.ledger
    }

    /// Whether a run is currently active for the pair.
    pub async fn is_running(&self, company_id: CompanyId, provider: &str) -> bool {
        self.active
            .lock()
            .await
            .contains_key(&(company_id, provider.to_string()))
    }

    /// Request cooperative cancellation of an active run.
    ///
    /// Returns false when no active run carries this id. Items already
    /// synced keep their mappings.
    pub async fn cancel(&self, run_id: RunId) -> bool {
        let active = self.active.lock().await;
        for handle in active.values() {
            if handle.run_id == run_id {
                handle.cancel.store(true, Ordering::SeqCst);
                return true;
            }
        }
        false
    }

    /// Start a sync run for the pair.
    ///
    /// Returns the run id immediately; the run executes in the background.
    /// A second trigger while the pair is running fails with
    /// [`SyncError::Conflict`].
    pub async fn trigger(self: &Arc<Self>, company_id: CompanyId, provider: &str) -> SyncResult<RunId> {
        self.directory.get(provider)?;
        if !self.vault.is_configured(company_id, provider).await? {
            return Err(SyncError::not_configured(provider));
        }

        let run = SyncRun::start(company_id, provider);
        let handle = RunHandle {
            run_id: run.id,
            cancel: Arc::new(AtomicBool::new(false)),
        };
        let key: PairKey = (company_id, provider.to_string());

        {
            let mut active = self.active.lock().await;
            if active.contains_key(&key) {
                return Err(SyncError::conflict(provider));
            }
            active.insert(key.clone(), handle.clone());
        }

        if let Err(e) = self.ledger.record_start(&run).await {
            self.active.lock().await.remove(&key);
            return Err(e);
        }

        info!(run_id = %run.id, %company_id, provider, "sync run accepted");

        let orchestrator = Arc::clone(self);
        let cancel = handle.cancel.clone();
        tokio::spawn(async move {
            orchestrator.supervise(key, run, cancel).await;
        });

        Ok(handle.run_id)
    }

    /// Run the body in its own task so a panic still finalizes the run and
    /// releases the pair lock.
    async fn supervise(self: Arc<Self>, key: PairKey, run: SyncRun, cancel: Arc<AtomicBool>) {
        let run_id = run.id;
        let body = {
            let orchestrator = Arc::clone(&self);
            tokio::spawn(async move { orchestrator.execute(run, cancel).await })
        };

        let finalized = match body.await {
            Ok(run) => run,
            Err(join_error) => {
                error!(%run_id, %join_error, "sync run body panicked");
                // Reconstruct a failed record; counts from the lost body are
                // unknowable.
                SyncRun {
                    id: run_id,
                    company_id: key.0,
                    provider: key.1.clone(),
                    ..SyncRun::start(key.0, key.1.clone())
                }
                .fail("sync run aborted unexpectedly")
            }
        };

        if let Err(e) = self.ledger.record_finish(&finalized).await {
            error!(%run_id, error = %e, "failed to record run result");
        }
        self.active.lock().await.remove(&key);
    }

    /// Execute the run body and return the finalized record.
    async fn execute(self: Arc<Self>, run: SyncRun, cancel: Arc<AtomicBool>) -> SyncRun {
        let company_id = run.company_id;
        let provider = run.provider.clone();

        // Pre-flight: credentials, settings, adapter, connectivity.
        let prepared = self.prepare(company_id, &provider).await;
        let (adapter, settings, retry) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                warn!(run_id = %run.id, %company_id, provider, error = %e, "pre-flight failed");
                return run.fail(e.to_string());
            }
        };

        let outcome = adapter.test_connection().await;
        if !outcome.ok {
            warn!(run_id = %run.id, %company_id, provider, detail = %outcome.detail, "connection test failed");
            return run.fail(format!("connection test failed: {}", outcome.detail));
        }

        let check_ins = match self.store.pending_check_ins(company_id).await {
            Ok(check_ins) => check_ins,
            Err(e) => return run.fail(format!("failed to load check-ins: {e}")),
        };

        let mut items_processed: u64 = 0;
        let mut errors: Vec<ItemError> = Vec::new();

        for check_in in check_ins {
            if cancel.load(Ordering::SeqCst) {
                info!(run_id = %run.id, "sync run cancelled");
                break;
            }

            // Already synced in a previous run.
            match self
                .store
                .get_mapping(
                    company_id,
                    &provider,
                    MappedEntity::Checkin,
                    check_in.id.as_uuid(),
                )
                .await
            {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    items_processed += 1;
                    errors.push(ItemError::item(check_in.id.as_uuid(), e.to_string()));
                    continue;
                }
            }

            match self
                .sync_item(&*adapter, &retry, &settings, &provider, &check_in)
                .await
            {
                Ok(ItemOutcome::Synced) => items_processed += 1,
                Ok(ItemOutcome::Skipped) => {}
                Err(e) => {
                    warn!(
                        run_id = %run.id,
                        check_in_id = %check_in.id,
                        error = %e,
                        "check-in sync failed"
                    );
                    items_processed += 1;
                    errors.push(ItemError::item(check_in.id.as_uuid(), e.to_string()));
                }
            }
        }

        run.finalize(items_processed, errors)
    }

    async fn prepare(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<(BoxedAdapter, SyncSettings, RetryExecutor)> {
        let credentials = self.vault.get(company_id, provider).await?;
        let settings = self.registry.get(company_id, provider).await?;
        let profile = self.directory.get(provider)?;
        let adapter = self.factory.build(profile, &credentials)?;
        let retry = RetryExecutor::new(profile.retry.clone());
        Ok((adapter, settings, retry))
    }

    /// Sync one check-in: resolve/create/update the customer, then push
    /// the check-in as a job, upserting mappings after each remote
    /// success.
    async fn sync_item(
        &self,
        adapter: &dyn fieldsync_connector::ProviderAdapter,
        retry: &RetryExecutor,
        settings: &SyncSettings,
        provider: &str,
        check_in: &CheckIn,
    ) -> SyncResult<ItemOutcome> {
        let company_id = check_in.company_id;
        let customer_local_id = check_in.customer.id;

        let mut remote_customer_id = self
            .store
            .get_mapping(
                company_id,
                provider,
                MappedEntity::Customer,
                customer_local_id,
            )
            .await?
            .map(|m| m.remote_id);

        if settings.sync_customers {
            match remote_customer_id.clone() {
                Some(remote_id) => {
                    if settings.update_existing_customers {
                        let record = check_in.customer_record();
                        let updated = retry
                            .execute(|| adapter.update_customer(&remote_id, &record))
                            .await?;
                        if updated != remote_id {
                            self.upsert_customer_mapping(check_in, provider, &updated)
                                .await?;
                            remote_customer_id = Some(updated);
                        }
                    }
                }
                None => {
                    let matched = self
                        .matcher
                        .resolve(adapter, &check_in.customer, settings.customer_match_strategy)
                        .await?;

                    match matched {
                        Some(remote_id) => {
                            self.upsert_customer_mapping(check_in, provider, &remote_id)
                                .await?;
                            if settings.update_existing_customers {
                                let record = check_in.customer_record();
                                retry
                                    .execute(|| adapter.update_customer(&remote_id, &record))
                                    .await?;
                            }
                            remote_customer_id = Some(remote_id);
                        }
                        None if settings.create_new_customers => {
                            let record = check_in.customer_record();
                            let remote_id = self
                                .create_with_recheck(
                                    company_id,
                                    provider,
                                    MappedEntity::Customer,
                                    customer_local_id,
                                    retry,
                                    || adapter.create_customer(&record),
                                )
                                .await?;
                            self.upsert_customer_mapping(check_in, provider, &remote_id)
                                .await?;
                            remote_customer_id = Some(remote_id);
                        }
                        None => return Ok(ItemOutcome::Skipped),
                    }
                }
            }
        }

        if settings.sync_checkins_as_jobs {
            let job = check_in.to_job_record(remote_customer_id, settings.sync_photos);
            let remote_job_id = self
                .create_with_recheck(
                    company_id,
                    provider,
                    MappedEntity::Checkin,
                    check_in.id.as_uuid(),
                    retry,
                    || adapter.push_check_in(&job),
                )
                .await?;
            self.store
                .upsert_mapping(RemoteMapping::new(
                    company_id,
                    provider,
                    MappedEntity::Checkin,
                    check_in.id.as_uuid(),
                    remote_job_id,
                ))
                .await?;
        }

        Ok(ItemOutcome::Synced)
    }

    async fn upsert_customer_mapping(
        &self,
        check_in: &CheckIn,
        provider: &str,
        remote_id: &str,
    ) -> SyncResult<()> {
        self.store
            .upsert_mapping(RemoteMapping::new(
                check_in.company_id,
                provider,
                MappedEntity::Customer,
                check_in.customer.id,
                remote_id,
            ))
            .await
    }

    /// Run a remote create, re-checking the mapping table before every
    /// attempt so a retry after an ambiguous failure cannot duplicate an
    /// entity that a previous attempt already created and mapped.
    async fn create_with_recheck<F, Fut>(
        &self,
        company_id: CompanyId,
        provider: &str,
        entity_type: MappedEntity,
        local_id: uuid::Uuid,
        retry: &RetryExecutor,
        mut op: F,
    ) -> SyncResult<String>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AdapterResult<String>>,
    {
        if let Some(mapping) = self
            .store
            .get_mapping(company_id, provider, entity_type, local_id)
            .await?
        {
            return Ok(mapping.remote_id);
        }

        let store = &self.store;
        let remote_id = retry
            .execute(|| {
                let fut = op();
                async move {
                    // Retry path: a previous attempt may have landed remotely
                    // even though its response was lost.
                    if let Ok(Some(mapping)) = store
                        .get_mapping(company_id, provider, entity_type, local_id)
                        .await
                    {
                        return Ok(mapping.remote_id);
                    }
                    fut.await
                }
            })
            .await?;
        Ok(remote_id)
    }
}

impl<S> std::fmt::Debug for SyncOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::CustomerIdentity;
    use crate::run::RunStatus;
    use crate::settings::{MatchStrategy, SyncSettingsUpdate};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use fieldsync_connector::{
        async_trait, generate_master_key, AdapterError, AuthKind, CheckInId, CredentialCipher,
        CustomerQuery, CustomerRecord, JobRecord, ProviderAdapter, ProviderCredentials,
        ProviderProfile, RemoteCustomer, RetryConfig, TestOutcome,
    };
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use uuid::Uuid;

    const PROVIDER: &str = "acme_fsm";

    /// Scriptable in-memory provider.
    #[derive(Default)]
    struct FakeProvider {
        /// Remote customers by normalized email.
        customers_by_email: StdMutex<StdHashMap<String, String>>,
        creates: AtomicUsize,
        updates: AtomicUsize,
        pushes: AtomicUsize,
        connection_ok: AtomicBool,
        /// Job types whose push fails permanently.
        failing_job_types: StdMutex<Vec<String>>,
        /// Pushes that fail transiently before succeeding.
        transient_push_failures: AtomicUsize,
        /// Per-push delay, for cancellation tests.
        push_delay: StdMutex<Duration>,
    }

    impl FakeProvider {
        fn new() -> Arc<Self> {
            let provider = Self::default();
            provider.connection_ok.store(true, Ordering::SeqCst);
            Arc::new(provider)
        }

        fn with_customer(self: Arc<Self>, email: &str, remote_id: &str) -> Arc<Self> {
            self.customers_by_email
                .lock()
                .unwrap()
                .insert(email.to_string(), remote_id.to_string());
            self
        }
    }

    #[async_trait]
    impl ProviderAdapter for FakeProvider {
        fn provider(&self) -> &str {
            PROVIDER
        }

        async fn test_connection(&self) -> TestOutcome {
            if self.connection_ok.load(Ordering::SeqCst) {
                TestOutcome::ok("connected")
            } else {
                TestOutcome::failed("authentication failed: bad key")
            }
        }

        async fn find_customer(
            &self,
            query: &CustomerQuery,
        ) -> fieldsync_connector::AdapterResult<Option<RemoteCustomer>> {
            let found = match query {
                CustomerQuery::Email(email) => {
                    self.customers_by_email.lock().unwrap().get(email).cloned()
                }
                _ => None,
            };
            Ok(found.map(|id| RemoteCustomer {
                id,
                name: None,
                email: None,
                phone: None,
            }))
        }

        async fn create_customer(
            &self,
            customer: &CustomerRecord,
        ) -> fieldsync_connector::AdapterResult<String> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst);
            let remote_id = format!("cust-{n}");
            if let Some(email) = &customer.email {
                self.customers_by_email
                    .lock()
                    .unwrap()
                    .insert(email.to_lowercase(), remote_id.clone());
            }
            Ok(remote_id)
        }

        async fn update_customer(
            &self,
            remote_id: &str,
            _customer: &CustomerRecord,
        ) -> fieldsync_connector::AdapterResult<String> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(remote_id.to_string())
        }

        async fn push_check_in(
            &self,
            job: &JobRecord,
        ) -> fieldsync_connector::AdapterResult<String> {
            let delay = *self.push_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.failing_job_types.lock().unwrap().contains(&job.job_type) {
                return Err(AdapterError::RemoteValidation {
                    message: "job rejected".to_string(),
                });
            }
            if self
                .transient_push_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n > 0).then(|| n - 1)
                })
                .is_ok()
            {
                return Err(AdapterError::network("connection reset"));
            }
            let n = self.pushes.fetch_add(1, Ordering::SeqCst);
            Ok(format!("job-{n}"))
        }
    }

    struct FakeFactory(Arc<FakeProvider>);

    impl AdapterFactory for FakeFactory {
        fn build(
            &self,
            _profile: &ProviderProfile,
            _credentials: &ProviderCredentials,
        ) -> fieldsync_connector::AdapterResult<BoxedAdapter> {
            Ok(self.0.clone())
        }
    }

    struct Harness {
        orchestrator: Arc<SyncOrchestrator<MemoryStore>>,
        store: Arc<MemoryStore>,
        provider: Arc<FakeProvider>,
        company: CompanyId,
    }

    async fn harness(provider: Arc<FakeProvider>) -> Harness {
        let mut directory = ProviderDirectory::new();
        let mut profile = ProviderProfile::new(
            PROVIDER,
            "Acme FSM",
            AuthKind::ApiKey,
            "https://api.acme.example",
        );
        profile.retry = RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 1.0,
            jitter: false,
        };
        directory.register(profile).unwrap();
        let directory = Arc::new(directory);

        let store = Arc::new(MemoryStore::new());
        let vault = Arc::new(CredentialVault::new(
            CredentialCipher::new(generate_master_key()),
            directory.clone(),
            store.clone(),
        ));
        let company = CompanyId::new();
        vault
            .configure(company, PROVIDER, &ProviderCredentials::api_key("k"))
            .await
            .unwrap();

        let orchestrator = SyncOrchestrator::new(
            vault,
            store.clone(),
            directory,
            Arc::new(FakeFactory(provider.clone())),
        );

        Harness {
            orchestrator,
            store,
            provider,
            company,
        }
    }

    fn check_in(company: CompanyId, email: Option<&str>, job_type: &str) -> CheckIn {
        CheckIn {
            id: CheckInId::new(),
            company_id: company,
            customer: CustomerIdentity {
                id: Uuid::new_v4(),
                name: "Jane Doe".to_string(),
                email: email.map(String::from),
                phone: None,
            },
            job_type: job_type.to_string(),
            notes: None,
            location: None,
            photos: vec![],
            created_at: Utc::now(),
        }
    }

    async fn wait_for_finish(h: &Harness, run_id: RunId) -> SyncRun {
        for _ in 0..200 {
            if let Some(run) = h.orchestrator.ledger().run(h.company, run_id).await.unwrap() {
                if run.is_finished() {
                    return run;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("run {run_id} did not finish in time");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_rejected() {
        let h = harness(FakeProvider::new()).await;
        let err = h
            .orchestrator
            .trigger(CompanyId::new(), PROVIDER)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured { .. }));

        let err = h
            .orchestrator
            .trigger(h.company, "unknown_crm")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Adapter(_)));
    }

    #[tokio::test]
    async fn test_end_to_end_creates_and_pushes() {
        let h = harness(FakeProvider::new()).await;
        h.store.add_check_in(check_in(h.company, Some("jane@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.items_processed, 1);
        assert_eq!(run.error_count, 0);
        assert_eq!(h.provider.creates.load(Ordering::SeqCst), 1);
        assert_eq!(h.provider.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let h = harness(FakeProvider::new()).await;
        h.store.add_check_in(check_in(h.company, Some("jane@x.com"), "repair"));

        let first = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        wait_for_finish(&h, first).await;

        let second = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, second).await;

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.items_processed, 0);
        assert_eq!(h.provider.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_matched_customer_is_not_duplicated() {
        let provider = FakeProvider::new().with_customer("jane@x.com", "cust-existing");
        let h = harness(provider).await;
        h.store.add_check_in(check_in(h.company, Some("Jane@X.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(h.provider.creates.load(Ordering::SeqCst), 0);
        // Matched customer is updated, not recreated.
        assert_eq!(h.provider.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unmatched_skipped_when_creation_disabled() {
        let h = harness(FakeProvider::new()).await;
        h.orchestrator
            .registry()
            .update(
                h.company,
                PROVIDER,
                &SyncSettingsUpdate {
                    create_new_customers: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        h.store.add_check_in(check_in(h.company, Some("jane@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        // Skipped items count as neither success nor error.
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.items_processed, 0);
        assert_eq!(run.error_count, 0);
        assert_eq!(h.provider.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_accounting() {
        let provider = FakeProvider::new();
        provider
            .failing_job_types
            .lock()
            .unwrap()
            .push("bad_job".to_string());
        let h = harness(provider).await;
        h.store.add_check_in(check_in(h.company, Some("a@x.com"), "repair"));
        h.store.add_check_in(check_in(h.company, Some("b@x.com"), "bad_job"));
        h.store.add_check_in(check_in(h.company, Some("c@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.items_processed, 3);
        assert_eq!(run.error_count, 1);
        assert_eq!(run.errors.len(), 1);
        assert!(run.errors[0].item_id.is_some());
        // The failure did not abort the remaining items.
        assert_eq!(h.provider.pushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_preflight_failure_finalizes_failed() {
        let provider = FakeProvider::new();
        provider.connection_ok.store(false, Ordering::SeqCst);
        let h = harness(provider).await;
        h.store.add_check_in(check_in(h.company, Some("a@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.items_processed, 0);
        assert_eq!(run.error_count, 1);
        assert!(run.errors[0].message.contains("connection test failed"));
        assert!(!h.orchestrator.is_running(h.company, PROVIDER).await);
    }

    #[tokio::test]
    async fn test_concurrent_trigger_conflicts() {
        let provider = FakeProvider::new();
        *provider.push_delay.lock().unwrap() = Duration::from_millis(100);
        let h = harness(provider).await;
        h.store.add_check_in(check_in(h.company, Some("a@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let err = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap_err();
        assert!(matches!(err, SyncError::Conflict { .. }));

        wait_for_finish(&h, run_id).await;
        // Lock released; a new trigger is accepted.
        let again = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        wait_for_finish(&h, again).await;
    }

    #[tokio::test]
    async fn test_distinct_pairs_run_in_parallel() {
        let provider = FakeProvider::new();
        *provider.push_delay.lock().unwrap() = Duration::from_millis(50);
        let h = harness(provider).await;

        // Same provider, different company: no conflict.
        let other = CompanyId::new();
        let store = h.store.clone();
        store.add_check_in(check_in(h.company, Some("a@x.com"), "repair"));

        let first = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        // The other company is unconfigured, but the conflict check must not
        // be what rejects it.
        let err = h.orchestrator.trigger(other, PROVIDER).await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured { .. }));

        wait_for_finish(&h, first).await;
    }

    #[tokio::test]
    async fn test_transient_push_is_retried() {
        let provider = FakeProvider::new();
        provider.transient_push_failures.store(1, Ordering::SeqCst);
        let h = harness(provider).await;
        h.store.add_check_in(check_in(h.company, Some("a@x.com"), "repair"));

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(h.provider.pushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_between_items() {
        let provider = FakeProvider::new();
        *provider.push_delay.lock().unwrap() = Duration::from_millis(50);
        let h = harness(provider).await;
        for i in 0..5 {
            h.store
                .add_check_in(check_in(h.company, Some(&format!("c{i}@x.com")), "repair"));
        }

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(h.orchestrator.cancel(run_id).await);

        let run = wait_for_finish(&h, run_id).await;
        // Items synced before cancellation keep their mappings.
        assert!(run.items_processed < 5);
        assert_eq!(run.error_count, 0);
        assert!(!h.orchestrator.cancel(run_id).await);
    }

    #[tokio::test]
    async fn test_photo_toggle_respected() {
        let provider = FakeProvider::new();
        let h = harness(provider).await;
        h.orchestrator
            .registry()
            .update(
                h.company,
                PROVIDER,
                &SyncSettingsUpdate {
                    customer_match_strategy: Some(MatchStrategy::Email),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut ci = check_in(h.company, Some("a@x.com"), "repair");
        ci.photos = vec!["https://cdn.example/p.jpg".to_string()];
        h.store.add_check_in(ci);

        let run_id = h.orchestrator.trigger(h.company, PROVIDER).await.unwrap();
        let run = wait_for_finish(&h, run_id).await;
        assert_eq!(run.status, RunStatus::Success);
    }
}
