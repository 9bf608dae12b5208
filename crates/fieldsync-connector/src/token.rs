//! In-memory OAuth2 bearer-token cache.
//!
//! Tokens are keyed by credential fingerprint so distinct credential sets
//! never share a token, and rotating a secret invalidates the cache entry.
//! A per-fingerprint lock serializes refreshes so concurrent runs do not
//! perform duplicate token exchanges for the same credential set.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::AdapterResult;

/// Safety margin subtracted from the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Token as issued by the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime reported by the provider, in seconds.
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Process-wide token cache shared across adapter instances.
#[derive(Default)]
pub struct TokenCache {
    tokens: RwLock<HashMap<String, CachedToken>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh cached token, or run `fetch` to obtain one.
    ///
    /// Concurrent callers for the same fingerprint serialize on the refresh
    /// lock; only the first performs the exchange, the rest reuse its
    /// result.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        fingerprint: &str,
        fetch: F,
    ) -> AdapterResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AdapterResult<IssuedToken>>,
    {
        // Fast path.
        if let Some(cached) = self.tokens.read().await.get(fingerprint) {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let lock = self.refresh_lock(fingerprint).await;
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(cached) = self.tokens.read().await.get(fingerprint) {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        debug!(fingerprint = %&fingerprint[..8.min(fingerprint.len())], "refreshing oauth2 token");
        let issued = fetch().await?;

        let ttl = Duration::from_secs(issued.expires_in_secs);
        let expires_at = Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN);
        self.tokens.write().await.insert(
            fingerprint.to_string(),
            CachedToken {
                access_token: issued.access_token.clone(),
                expires_at,
            },
        );

        Ok(issued.access_token)
    }

    /// Drop a cached token (e.g. after a 401 from the provider).
    pub async fn invalidate(&self, fingerprint: &str) {
        self.tokens.write().await.remove(fingerprint);
    }

    async fn refresh_lock(&self, fingerprint: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}
