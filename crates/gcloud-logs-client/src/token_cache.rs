//! Access token caching for Cloud Logging authentication
//!
//! Caches the OAuth access token printed by `gcloud auth print-access-token` to
//! avoid a slow exec call on every poll while tailing. Tokens are kept in memory
//! only, with a 5-minute TTL (gcloud access tokens are valid for an hour).

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::Mutex;

/// Default TTL for cached tokens (5 minutes)
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(300);

/// Tokens this close to expiry are treated as expired
const EXPIRY_BUFFER: Duration = Duration::from_secs(30);

/// Cached token entry
#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn new(token: String, ttl: Duration) -> Self {
        Self {
            token,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if the token is still valid (not expired)
    fn is_valid(&self) -> bool {
        self.expires_at > Instant::now() + EXPIRY_BUFFER
    }
}

/// Single-slot in-memory token cache
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    ttl: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_ttl(TOKEN_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached token, or run `fetch` and cache its result.
    ///
    /// The lock is held while fetching so concurrent callers share one exec.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref().filter(|t| t.is_valid()) {
            return Ok(cached.token.clone());
        }

        let token = fetch().await?;
        *slot = Some(CachedToken::new(token.clone(), self.ttl));
        Ok(token)
    }

    /// Drop the cached token (used when the backend rejects it)
    pub async fn clear(&self) {
        self.slot.lock().await.take();
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn fetch_counted(counter: &AtomicUsize) -> Result<String> {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{}", n))
    }

    async fn fetch_failing() -> Result<String> {
        anyhow::bail!("gcloud not logged in")
    }

    async fn fetch_fixed(token: &str) -> Result<String> {
        Ok(token.to_string())
    }

    #[tokio::test]
    async fn test_token_is_reused_within_ttl() {
        let cache = TokenCache::new();
        let fetches = AtomicUsize::new(0);

        let first = cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();
        let second = cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cache = TokenCache::new();
        let fetches = AtomicUsize::new(0);

        cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();
        cache.clear().await;
        let token = cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();

        assert_eq!(token, "token-2");
    }

    #[tokio::test]
    async fn test_short_ttl_never_caches() {
        // Anything inside the expiry buffer counts as expired
        let cache = TokenCache::with_ttl(Duration::from_secs(10));
        let fetches = AtomicUsize::new(0);

        cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();
        cache.get_or_fetch(|| fetch_counted(&fetches)).await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = TokenCache::new();

        let err = cache.get_or_fetch(fetch_failing).await;
        assert!(err.is_err());

        let token = cache.get_or_fetch(|| fetch_fixed("fresh")).await.unwrap();
        assert_eq!(token, "fresh");
    }
}
