//! Tier fetch errors

use crate::tier::Tier;
use std::time::Duration;
use thiserror::Error;

/// Failure fetching one tier
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Source unreachable or returned a server error
    #[error("{tier} source unavailable: {message}")]
    Unavailable { tier: Tier, message: String },

    /// Source answered but refused the request, or the body was unusable
    #[error("{tier} request rejected: {message}")]
    Rejected { tier: Tier, message: String },

    /// One attempt exceeded its time budget
    #[error("{tier} fetch timed out after {}ms", .after.as_millis())]
    Timeout { tier: Tier, after: Duration },
}

impl FetchError {
    /// Check if another attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    #[inline]
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Unavailable { tier, .. } | Self::Rejected { tier, .. } | Self::Timeout { tier, .. } => {
                *tier
            }
        }
    }
}
