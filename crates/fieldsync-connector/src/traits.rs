//! Provider adapter capability traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::credentials::ProviderCredentials;
use crate::error::AdapterResult;
use crate::profile::ProviderProfile;
use crate::types::{CustomerQuery, CustomerRecord, JobRecord, RemoteCustomer, TestOutcome};

/// One provider integration the sync engine can drive.
///
/// Customer upsert is split into find/create/update; the orchestrator
/// decides which to call based on the remote mapping table and the
/// company's sync settings.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider key this adapter talks to.
    fn provider(&self) -> &str;

    /// Probe connectivity and credentials.
    ///
    /// Never returns an error: network and auth failures fold into
    /// `ok = false` with a human-readable reason.
    async fn test_connection(&self) -> TestOutcome;

    /// Search the remote system for a customer matching the query.
    async fn find_customer(&self, query: &CustomerQuery) -> AdapterResult<Option<RemoteCustomer>>;

    /// Create a customer remotely; returns the remote id.
    async fn create_customer(&self, customer: &CustomerRecord) -> AdapterResult<String>;

    /// Update an existing remote customer; returns the (possibly new)
    /// remote id.
    async fn update_customer(
        &self,
        remote_id: &str,
        customer: &CustomerRecord,
    ) -> AdapterResult<String>;

    /// Push a check-in as a job; returns the remote job id.
    async fn push_check_in(&self, job: &JobRecord) -> AdapterResult<String>;
}

/// Shared adapter handle.
pub type BoxedAdapter = Arc<dyn ProviderAdapter>;

/// Builds adapters from a profile plus decrypted credentials.
///
/// The production factory builds the two HTTP adapters; tests substitute
/// their own.
pub trait AdapterFactory: Send + Sync {
    /// Build an adapter for the given provider and credentials.
    fn build(
        &self,
        profile: &ProviderProfile,
        credentials: &ProviderCredentials,
    ) -> AdapterResult<BoxedAdapter>;
}
