//! Periodic tier refresh
//!
//! A spawned task reloads one page on a fixed interval and publishes each
//! complete [`TierSet`] over a watch channel. Subscribers always observe a
//! whole set; slices are never patched in place.

use crate::fetch::TierLoader;
use crate::merge::MergedViewModel;
use crate::tier::{TierPath, TierScope, TierSet};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default auto-refresh interval
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest accepted refresh interval
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns refresh tasks for pages
#[derive(Debug, Clone)]
pub struct TierRefresher {
    loader: TierLoader,
    interval: Duration,
}

impl TierRefresher {
    #[inline]
    #[must_use]
    pub fn new(loader: TierLoader) -> Self {
        Self {
            loader,
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Set the refresh period, raised to [`MIN_REFRESH_INTERVAL`] if shorter
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_REFRESH_INTERVAL);
        self
    }

    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start refreshing `path`
    ///
    /// The first load starts immediately; until it resolves, subscribers see
    /// every in-scope tier loading. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(&self, path: TierPath) -> RefreshHandle {
        let scope = path.scope();
        let (tx, rx) = watch::channel(TierSet::loading(scope));
        let loader = self.loader.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // first tick completes immediately and may use warm cache entries
            ticker.tick().await;
            let mut set = loader.load(&path).await;
            loop {
                if tx.send(set).is_err() {
                    tracing::debug!(page = %path, "refresh subscribers gone");
                    break;
                }
                ticker.tick().await;
                tracing::debug!(page = %path, "refreshing tiers");
                set = loader.reload(&path).await;
            }
        });

        RefreshHandle { rx, scope, task }
    }
}

/// Live view of one page's tiers
///
/// Dropping the handle stops its refresh task.
#[derive(Debug)]
pub struct RefreshHandle {
    rx: watch::Receiver<TierSet>,
    scope: TierScope,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Latest published set
    #[must_use]
    pub fn current(&self) -> TierSet {
        self.rx.borrow().clone()
    }

    /// Latest published set, merged for the page scope
    #[must_use]
    pub fn merged(&self) -> MergedViewModel {
        self.rx.borrow().merge(self.scope)
    }

    /// Wait for the next published set
    ///
    /// # Errors
    /// If the refresh task has stopped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// Additional receiver for the same page
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TierSet> {
        self.rx.clone()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
