//! OSA Tiers
//!
//! Loading and merging of tiered result data. A results page is addressed
//! by up to three nested tier names (section, sub-section, page); each tier
//! is fetched independently and the three slices are merged into one
//! display model with deeper tiers taking precedence.
//!
//! # Example
//!
//! ```rust,ignore
//! use osa_tiers::prelude::*;
//!
//! let loader = TierLoader::new(Arc::new(my_fetcher));
//! let path = TierPath::new("Strategy Plans").with_tier2("OSA");
//!
//! let set = loader.load(&path).await;
//! let view = set.merge(path.scope());
//! println!("{} ({}%)", view.agent_source.unwrap_or_default(), view.confidence_score);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod refresh;
pub mod tier;

pub use cache::TierCache;
pub use error::FetchError;
pub use fetch::{RetryPolicy, TierFetcher, TierLoader};
pub use merge::{merge, merge_scoped, MergedViewModel, TierError, ViewState};
pub use refresh::{RefreshHandle, TierRefresher, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL};
pub use tier::{Tier, TierMetadata, TierPath, TierPayload, TierScope, TierSet, TierSlice};

/// Prelude for common imports
pub mod prelude {
    pub use crate::fetch::{RetryPolicy, TierFetcher, TierLoader};
    pub use crate::merge::{merge, merge_scoped, MergedViewModel, ViewState};
    pub use crate::refresh::{RefreshHandle, TierRefresher};
    pub use crate::tier::{Tier, TierPath, TierScope, TierSet, TierSlice};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
