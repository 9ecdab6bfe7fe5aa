//! Tier loading with retry and caching
//!
//! [`TierLoader`] issues the in-scope tier fetches concurrently. Each tier
//! is retried independently under a [`RetryPolicy`]; a tier that exhausts
//! its budget becomes an error slice and never fails its siblings.

use crate::cache::{TierCache, DEFAULT_CAPACITY};
use crate::error::FetchError;
use crate::tier::{Tier, TierPath, TierPayload, TierScope, TierSet, TierSlice};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of tier data
#[async_trait]
pub trait TierFetcher: Send + Sync {
    /// Fetch one tier of one page
    async fn fetch(&self, path: &TierPath, tier: Tier) -> Result<TierPayload, FetchError>;
}

/// Bounded fixed-delay retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Budget for a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Loads whole [`TierSet`]s for pages
#[derive(Clone)]
pub struct TierLoader {
    fetcher: Arc<dyn TierFetcher>,
    policy: RetryPolicy,
    cache: TierCache,
}

impl TierLoader {
    #[must_use]
    pub fn new(fetcher: Arc<dyn TierFetcher>) -> Self {
        Self {
            fetcher,
            policy: RetryPolicy::default(),
            cache: TierCache::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: TierCache) -> Self {
        self.cache = cache;
        self
    }

    /// Cache entries expire after `ttl`
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(self, ttl: Duration) -> Self {
        self.with_cache(TierCache::with_ttl(DEFAULT_CAPACITY, ttl))
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &TierCache {
        &self.cache
    }

    /// Load every tier the page names
    ///
    /// Tiers outside the page's scope are left idle. Completion order of
    /// the individual fetches does not matter.
    pub async fn load(&self, path: &TierPath) -> TierSet {
        let scope = path.scope();
        let (tier1, tier2, tier3) = futures::join!(
            self.load_tier(path, scope, Tier::Tier1),
            self.load_tier(path, scope, Tier::Tier2),
            self.load_tier(path, scope, Tier::Tier3),
        );
        TierSet {
            tier1,
            tier2,
            tier3,
        }
    }

    /// Bypass the cache for one page
    pub async fn reload(&self, path: &TierPath) -> TierSet {
        self.cache.invalidate_page(path).await;
        self.load(path).await
    }

    async fn load_tier(&self, path: &TierPath, scope: TierScope, tier: Tier) -> TierSlice {
        if !scope.contains(tier) {
            return TierSlice::default();
        }
        if let Some(payload) = self.cache.get(path, tier).await {
            tracing::trace!(page = %path, %tier, "tier cache hit");
            return TierSlice::loaded(payload);
        }

        match self.fetch_with_retry(path, tier).await {
            Ok(payload) => {
                self.cache.insert(path, tier, payload.clone()).await;
                TierSlice::loaded(payload)
            }
            Err(err) => {
                tracing::warn!(page = %path, %tier, error = %err, "tier fetch failed");
                TierSlice::failed(err.to_string())
            }
        }
    }

    /// Fetch one tier under the retry policy
    ///
    /// # Errors
    /// The last error once attempts are exhausted, or the first
    /// non-retryable error.
    pub async fn fetch_with_retry(
        &self,
        path: &TierPath,
        tier: Tier,
    ) -> Result<TierPayload, FetchError> {
        let mut attempt = 1;
        loop {
            let result =
                match tokio::time::timeout(self.policy.attempt_timeout, self.fetcher.fetch(path, tier))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        tier,
                        after: self.policy.attempt_timeout,
                    }),
                };

            match result {
                Ok(payload) => return Ok(payload),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    tracing::debug!(page = %path, %tier, attempt, error = %err, "retrying tier fetch");
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for TierLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierLoader")
            .field("policy", &self.policy)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}
