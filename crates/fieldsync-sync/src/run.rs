//! Sync run records and their lifecycle.

use chrono::{DateTime, Utc};
use fieldsync_connector::{CompanyId, RunId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still executing.
    Running,
    /// Every processed item succeeded.
    Success,
    /// Some items succeeded, some failed.
    Partial,
    /// Nothing succeeded, or the run never got past pre-flight.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One failed item inside a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    /// Local id of the failed item, when the failure is item-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,
    pub message: String,
}

impl ItemError {
    /// Failure tied to a specific item.
    pub fn item(item_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id),
            message: message.into(),
        }
    }

    /// Run-level failure not tied to an item.
    pub fn run(message: impl Into<String>) -> Self {
        Self {
            item_id: None,
            message: message.into(),
        }
    }
}

/// Record of one synchronization run. Immutable once finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: RunId,
    pub company_id: CompanyId,
    pub provider: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Items the run attempted (successes plus failures; skips excluded).
    pub items_processed: u64,
    pub error_count: u64,
    #[serde(default)]
    pub errors: Vec<ItemError>,
}

impl SyncRun {
    /// Start a new run in the `Running` state.
    pub fn start(company_id: CompanyId, provider: impl Into<String>) -> Self {
        Self {
            id: RunId::new(),
            company_id,
            provider: provider.into(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            items_processed: 0,
            error_count: 0,
            errors: Vec::new(),
        }
    }

    /// Finalize with counts and accumulated errors.
    ///
    /// Status derivation: no errors means success, errors on every
    /// processed item means failed, anything in between is partial. A run
    /// that processed nothing but carries errors (pre-flight failure) is
    /// failed.
    pub fn finalize(mut self, items_processed: u64, errors: Vec<ItemError>) -> Self {
        let error_count = errors.len() as u64;
        self.status = if error_count == 0 {
            RunStatus::Success
        } else if items_processed == 0 || error_count >= items_processed {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        };
        self.items_processed = items_processed;
        self.error_count = error_count;
        self.errors = errors;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Finalize as failed with a single run-level error.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.finalize(0, vec![ItemError::run(message)])
    }

    /// Whether the run has been finalized.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> SyncRun {
        SyncRun::start(CompanyId::new(), "orbit_crm")
    }

    #[test]
    fn test_all_ok_is_success() {
        let run = run().finalize(5, vec![]);
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.items_processed, 5);
        assert_eq!(run.error_count, 0);
        assert!(run.is_finished());
    }

    #[test]
    fn test_zero_items_is_success() {
        // Nothing eligible still counts as a clean run.
        let run = run().finalize(0, vec![]);
        assert_eq!(run.status, RunStatus::Success);
    }

    #[test]
    fn test_some_errors_is_partial() {
        let errors = vec![ItemError::item(Uuid::new_v4(), "push rejected")];
        let run = run().finalize(3, errors);
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.error_count, 1);
    }

    #[test]
    fn test_all_errors_is_failed() {
        let errors = vec![
            ItemError::item(Uuid::new_v4(), "a"),
            ItemError::item(Uuid::new_v4(), "b"),
        ];
        let run = run().finalize(2, errors);
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn test_preflight_failure_is_failed() {
        let run = run().fail("connection test failed");
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.items_processed, 0);
        assert_eq!(run.error_count, 1);
        assert!(run.errors[0].item_id.is_none());
    }
}
