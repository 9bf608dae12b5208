//! Encrypted per-company credential vault.
//!
//! Credentials are validated once at this boundary, then serialized and
//! encrypted with the company-derived key. Everything past the vault works
//! with the decrypted union; clients only ever see a configured flag.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fieldsync_connector::{CompanyId, CredentialCipher, ProviderCredentials, ProviderDirectory};
use tracing::info;

use crate::error::{SyncError, SyncResult};
use crate::store::{CredentialStore, SettingsStore, StoredCredential};

/// Vault over the credential store plus the company-derived cipher.
pub struct CredentialVault<S> {
    cipher: CredentialCipher,
    directory: Arc<ProviderDirectory>,
    store: Arc<S>,
}

impl<S> CredentialVault<S>
where
    S: CredentialStore + SettingsStore,
{
    /// Create a vault.
    pub fn new(cipher: CredentialCipher, directory: Arc<ProviderDirectory>, store: Arc<S>) -> Self {
        Self {
            cipher,
            directory,
            store,
        }
    }

    /// Validate, encrypt, and store credentials for a (company, provider)
    /// pair. Replaces any existing credential. Returns the configured-at
    /// timestamp.
    pub async fn configure(
        &self,
        company_id: CompanyId,
        provider: &str,
        credentials: &ProviderCredentials,
    ) -> SyncResult<DateTime<Utc>> {
        let profile = self.directory.get(provider)?;
        credentials.validate_for(profile.auth_kind)?;

        let blob = self.cipher.encrypt_json(company_id, credentials)?;
        let configured_at = Utc::now();
        self.store
            .put_credential(
                company_id,
                provider,
                StoredCredential {
                    blob,
                    configured_at,
                },
            )
            .await?;

        info!(%company_id, provider, auth_kind = %credentials.auth_kind(), "credentials configured");
        Ok(configured_at)
    }

    /// Decrypt the stored credentials for server-internal use.
    pub async fn get(
        &self,
        company_id: CompanyId,
        provider: &str,
    ) -> SyncResult<ProviderCredentials> {
        let stored = self
            .store
            .get_credential(company_id, provider)
            .await?
            .ok_or_else(|| SyncError::not_configured(provider))?;

        let credentials = self.cipher.decrypt_json(company_id, &stored.blob)?;
        Ok(credentials)
    }

    /// Remove the credential and the pair's sync settings. Idempotent.
    ///
    /// Remote mappings are intentionally kept so a reconfigured
    /// integration stays idempotent.
    pub async fn remove(&self, company_id: CompanyId, provider: &str) -> SyncResult<()> {
        let existed = self.store.delete_credential(company_id, provider).await?;
        self.store.delete_settings(company_id, provider).await?;
        if existed {
            info!(%company_id, provider, "integration removed");
        }
        Ok(())
    }

    /// Whether the pair has a configured credential.
    pub async fn is_configured(&self, company_id: CompanyId, provider: &str) -> SyncResult<bool> {
        Ok(self
            .store
            .get_credential(company_id, provider)
            .await?
            .is_some())
    }

    /// Providers with configured credentials, sorted.
    pub async fn list_configured(&self, company_id: CompanyId) -> SyncResult<Vec<String>> {
        Ok(self.store.configured_providers(company_id).await?)
    }
}

impl<S> std::fmt::Debug for CredentialVault<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use fieldsync_connector::{generate_master_key, AuthKind, ProviderProfile};

    fn directory() -> Arc<ProviderDirectory> {
        let mut dir = ProviderDirectory::new();
        dir.register(ProviderProfile::new(
            "acme_fsm",
            "Acme FSM",
            AuthKind::ApiKey,
            "https://api.acme.example",
        ))
        .unwrap();
        dir.register(
            ProviderProfile::new(
                "orbit_crm",
                "Orbit CRM",
                AuthKind::OAuth2,
                "https://api.orbit.example",
            )
            .with_token_url("https://login.orbit.example/{tenant_id}/token"),
        )
        .unwrap();
        Arc::new(dir)
    }

    fn vault() -> CredentialVault<MemoryStore> {
        CredentialVault::new(
            CredentialCipher::new(generate_master_key()),
            directory(),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_configure_and_get_roundtrip() {
        let vault = vault();
        let company = CompanyId::new();
        let creds = ProviderCredentials::api_key("secret-key");

        vault.configure(company, "acme_fsm", &creds).await.unwrap();
        assert!(vault.is_configured(company, "acme_fsm").await.unwrap());

        let fetched = vault.get(company, "acme_fsm").await.unwrap();
        assert_eq!(fetched.fingerprint(), creds.fingerprint());
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let vault = vault();
        let err = vault
            .configure(
                CompanyId::new(),
                "unknown_crm",
                &ProviderCredentials::api_key("k"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Adapter(fieldsync_connector::AdapterError::UnsupportedProvider { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_auth_kind_rejected() {
        let vault = vault();
        // orbit_crm requires oauth2.
        let err = vault
            .configure(
                CompanyId::new(),
                "orbit_crm",
                &ProviderCredentials::api_key("k"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Adapter(_)));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let vault = vault();
        let err = vault
            .configure(
                CompanyId::new(),
                "orbit_crm",
                &ProviderCredentials::oauth2("cid", "", "tenant"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Adapter(_)));
    }

    #[tokio::test]
    async fn test_get_unconfigured_is_not_configured() {
        let vault = vault();
        let err = vault.get(CompanyId::new(), "acme_fsm").await.unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let vault = vault();
        let company = CompanyId::new();

        vault
            .configure(company, "acme_fsm", &ProviderCredentials::api_key("k"))
            .await
            .unwrap();
        vault.remove(company, "acme_fsm").await.unwrap();
        assert!(!vault.is_configured(company, "acme_fsm").await.unwrap());

        // Second removal is a no-op.
        vault.remove(company, "acme_fsm").await.unwrap();
    }

    #[tokio::test]
    async fn test_companies_are_isolated() {
        let vault = vault();
        let a = CompanyId::new();
        let b = CompanyId::new();

        vault
            .configure(a, "acme_fsm", &ProviderCredentials::api_key("key-a"))
            .await
            .unwrap();

        assert!(!vault.is_configured(b, "acme_fsm").await.unwrap());
        assert_eq!(vault.list_configured(a).await.unwrap(), vec!["acme_fsm"]);
        assert!(vault.list_configured(b).await.unwrap().is_empty());
    }
}
