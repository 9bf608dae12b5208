//! CRM synchronization engine.
//!
//! Pulls field-service check-ins and pushes them to a configured CRM
//! provider: encrypted per-company credentials ([`CredentialVault`]),
//! per-pair sync settings ([`ConfigurationRegistry`]), remote customer
//! matching ([`CustomerMatcher`]), idempotent run orchestration
//! ([`SyncOrchestrator`]), and run history ([`SyncHistoryLedger`]).
//! Storage is pluggable: Postgres in production, in-memory for tests.

pub mod checkin;
pub mod error;
pub mod history;
pub mod mapping;
pub mod matcher;
pub mod orchestrator;
pub mod registry;
pub mod run;
pub mod settings;
pub mod store;
pub mod vault;

pub use checkin::{CheckIn, CustomerIdentity};
pub use error::{SyncError, SyncResult};
pub use history::SyncHistoryLedger;
pub use mapping::{MappedEntity, RemoteMapping};
pub use matcher::CustomerMatcher;
pub use orchestrator::{SyncOrchestrator, SyncStore};
pub use registry::ConfigurationRegistry;
pub use run::{ItemError, RunStatus, SyncRun};
pub use settings::{MatchStrategy, SyncSettings, SyncSettingsUpdate};
pub use store::{MemoryStore, PgStore};
pub use vault::CredentialVault;
