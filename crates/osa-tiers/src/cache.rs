//! Per-page tier cache using moka
//!
//! Entries are keyed by page path and tier and expire after the refresh
//! interval, so a refresh cycle always reaches the source at least once.

use crate::tier::{Tier, TierPath, TierPayload};
use moka::future::Cache;
use std::time::Duration;

/// Default number of cached tier payloads
pub const DEFAULT_CAPACITY: u64 = 1_000;

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TierKey {
    page_path: String,
    tier: Tier,
}

impl TierKey {
    #[inline]
    #[must_use]
    pub fn new(path: &TierPath, tier: Tier) -> Self {
        Self {
            page_path: path.page_path(),
            tier,
        }
    }
}

/// Cache of successfully fetched tier payloads
#[derive(Debug, Clone)]
pub struct TierCache {
    inner: Cache<TierKey, TierPayload>,
}

impl TierCache {
    /// Create cache whose entries live for `ttl`
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    #[inline]
    pub async fn insert(&self, path: &TierPath, tier: Tier, payload: TierPayload) {
        self.inner.insert(TierKey::new(path, tier), payload).await;
    }

    #[inline]
    pub async fn get(&self, path: &TierPath, tier: Tier) -> Option<TierPayload> {
        self.inner.get(&TierKey::new(path, tier)).await
    }

    /// Drop every tier of one page
    pub async fn invalidate_page(&self, path: &TierPath) {
        for tier in Tier::ALL {
            self.inner.invalidate(&TierKey::new(path, tier)).await;
        }
    }

    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for TierCache {
    /// 60 second TTL, matching the default refresh interval
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CAPACITY, Duration::from_secs(60))
    }
}
