//! Remote customer matching.

use fieldsync_connector::{AdapterResult, CustomerQuery, ProviderAdapter};
use tracing::debug;

use crate::checkin::CustomerIdentity;
use crate::settings::MatchStrategy;

/// Normalize an email for matching: trimmed, lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize a phone number for matching: digits only.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a full name for matching: trimmed, lowercased, collapsed
/// internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Matches local customers against the remote system through an adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerMatcher;

impl CustomerMatcher {
    /// Queries to try for an identity under a strategy, in order.
    ///
    /// Fields the identity does not carry produce no query; `All` falls
    /// through email, phone, then name (the documented last resort).
    fn queries(identity: &CustomerIdentity, strategy: MatchStrategy) -> Vec<CustomerQuery> {
        let email = identity
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .map(CustomerQuery::Email);
        let phone = identity
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty())
            .map(CustomerQuery::Phone);
        let name = Some(normalize_name(&identity.name))
            .filter(|n| !n.is_empty())
            .map(CustomerQuery::Name);

        match strategy {
            MatchStrategy::Email => email.into_iter().collect(),
            MatchStrategy::Phone => phone.into_iter().collect(),
            MatchStrategy::Name => name.into_iter().collect(),
            MatchStrategy::All => [email, phone, name].into_iter().flatten().collect(),
        }
    }

    /// Resolve a local identity to a remote customer id; first hit wins.
    pub async fn resolve(
        &self,
        adapter: &dyn ProviderAdapter,
        identity: &CustomerIdentity,
        strategy: MatchStrategy,
    ) -> AdapterResult<Option<String>> {
        for query in Self::queries(identity, strategy) {
            if let Some(remote) = adapter.find_customer(&query).await? {
                debug!(
                    local_id = %identity.id,
                    remote_id = %remote.id,
                    field = query.param(),
                    "customer matched"
                );
                return Ok(Some(remote.id));
            }
        }
        Ok(None)
    }
}
