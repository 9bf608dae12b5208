//! Per-pair synchronization settings.

use serde::{Deserialize, Serialize};

/// How to match a local customer against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Email,
    Phone,
    Name,
    /// Email, then phone, then name; first hit wins.
    #[default]
    All,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchStrategy::Email => "email",
            MatchStrategy::Phone => "phone",
            MatchStrategy::Name => "name",
            MatchStrategy::All => "all",
        };
        f.write_str(s)
    }
}

/// Sync behavior for one (company, provider) pair.
///
/// A pair with no stored settings behaves exactly like a stored default
/// row: everything on except photo sync, match on all fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_on")]
    pub sync_customers: bool,
    #[serde(default = "default_on")]
    pub create_new_customers: bool,
    #[serde(default = "default_on")]
    pub update_existing_customers: bool,
    #[serde(default = "default_on")]
    pub sync_checkins_as_jobs: bool,
    #[serde(default)]
    pub sync_photos: bool,
    #[serde(default)]
    pub customer_match_strategy: MatchStrategy,
}

fn default_on() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_customers: true,
            create_new_customers: true,
            update_existing_customers: true,
            sync_checkins_as_jobs: true,
            sync_photos: false,
            customer_match_strategy: MatchStrategy::All,
        }
    }
}

/// Partial settings update; unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSettingsUpdate {
    pub sync_customers: Option<bool>,
    pub create_new_customers: Option<bool>,
    pub update_existing_customers: Option<bool>,
    pub sync_checkins_as_jobs: Option<bool>,
    pub sync_photos: Option<bool>,
    pub customer_match_strategy: Option<MatchStrategy>,
}

impl SyncSettingsUpdate {
    /// Merge this update over a base settings value.
    pub fn apply(&self, base: &SyncSettings) -> SyncSettings {
        SyncSettings {
            sync_customers: self.sync_customers.unwrap_or(base.sync_customers),
            create_new_customers: self
                .create_new_customers
                .unwrap_or(base.create_new_customers),
            update_existing_customers: self
                .update_existing_customers
                .unwrap_or(base.update_existing_customers),
            sync_checkins_as_jobs: self
                .sync_checkins_as_jobs
                .unwrap_or(base.sync_checkins_as_jobs),
            sync_photos: self.sync_photos.unwrap_or(base.sync_photos),
            customer_match_strategy: self
                .customer_match_strategy
                .unwrap_or(base.customer_match_strategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = SyncSettings::default();
        assert!(s.sync_customers);
        assert!(s.create_new_customers);
        assert!(s.update_existing_customers);
        assert!(s.sync_checkins_as_jobs);
        assert!(!s.sync_photos);
        assert_eq!(s.customer_match_strategy, MatchStrategy::All);
    }

    #[test]
    fn test_partial_update_keeps_unset_fields() {
        let base = SyncSettings::default();
        let update = SyncSettingsUpdate {
            sync_photos: Some(true),
            customer_match_strategy: Some(MatchStrategy::Email),
            ..Default::default()
        };

        let merged = update.apply(&base);
        assert!(merged.sync_photos);
        assert_eq!(merged.customer_match_strategy, MatchStrategy::Email);
        assert!(merged.sync_customers);
        assert!(merged.create_new_customers);
    }

    #[test]
    fn test_strategy_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&MatchStrategy::Email).unwrap(),
            "\"email\""
        );
        let parsed: MatchStrategy = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(parsed, MatchStrategy::All);
    }

    #[test]
    fn test_empty_json_deserializes_to_defaults() {
        let parsed: SyncSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, SyncSettings::default());
    }
}
