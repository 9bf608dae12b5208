//! Provider adapter framework for field-service CRM synchronization.
//!
//! This crate defines the capability surface the sync engine drives
//! ([`ProviderAdapter`]), the credential union and its encryption
//! ([`ProviderCredentials`], [`CredentialCipher`]), provider profiles and
//! the directory of supported providers, a transient-aware retry executor,
//! and the two built-in HTTP adapters (OAuth2 client-credentials and static
//! API key).
//!
//! # Example
//!
//! ```no_run
//! use fieldsync_connector::{
//!     AdapterFactory, AuthKind, HttpAdapterFactory, ProviderCredentials, ProviderProfile,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ProviderProfile::new(
//!     "acme_fsm",
//!     "Acme FSM",
//!     AuthKind::ApiKey,
//!     "https://api.acme-fsm.example/v1",
//! );
//! let factory = HttpAdapterFactory::new();
//! let adapter = factory.build(&profile, &ProviderCredentials::api_key("secret"))?;
//! let outcome = adapter.test_connection().await;
//! println!("connected: {}", outcome.ok);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod ids;
pub mod profile;
pub mod resilience;
pub mod token;
pub mod traits;
pub mod types;

pub use adapters::{ApiKeyAdapter, HttpAdapterFactory, OAuth2Adapter};
pub use credentials::{AuthKind, ProviderCredentials, REDACTED};
pub use crypto::{generate_master_key, CredentialCipher};
pub use error::{AdapterError, AdapterResult};
pub use ids::{CheckInId, CompanyId, RunId};
pub use profile::{EndpointPaths, HttpSettings, ProviderDirectory, ProviderProfile};
pub use resilience::{RetryConfig, RetryExecutor};
pub use token::{IssuedToken, TokenCache};
pub use traits::{AdapterFactory, BoxedAdapter, ProviderAdapter};
pub use types::{CustomerQuery, CustomerRecord, JobRecord, RemoteCustomer, TestOutcome};

// Re-export for implementors of [`ProviderAdapter`].
pub use async_trait::async_trait;
