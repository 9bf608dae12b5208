//! Shared API state.

use std::sync::Arc;

use fieldsync_connector::{AdapterFactory, CompanyId, ProviderDirectory};
use fieldsync_sync::orchestrator::SyncStore;
use fieldsync_sync::{CredentialVault, SyncOrchestrator};

/// Company scope installed by the authentication layer as a request
/// extension.
#[derive(Debug, Clone, Copy)]
pub struct CompanyContext {
    pub company_id: CompanyId,
}

/// Everything the integration handlers need.
pub struct IntegrationsState<S> {
    pub vault: Arc<CredentialVault<S>>,
    pub orchestrator: Arc<SyncOrchestrator<S>>,
    pub directory: Arc<ProviderDirectory>,
    pub factory: Arc<dyn AdapterFactory>,
}

impl<S: SyncStore> IntegrationsState<S> {
    pub fn new(
        vault: Arc<CredentialVault<S>>,
        orchestrator: Arc<SyncOrchestrator<S>>,
        directory: Arc<ProviderDirectory>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            vault,
            orchestrator,
            directory,
            factory,
        }
    }
}

impl<S> Clone for IntegrationsState<S> {
    fn clone(&self) -> Self {
        Self {
            vault: self.vault.clone(),
            orchestrator: self.orchestrator.clone(),
            directory: self.directory.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<S> std::fmt::Debug for IntegrationsState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationsState").finish_non_exhaustive()
    }
}
