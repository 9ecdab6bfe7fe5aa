//! Tier data merger
//!
//! Pure and synchronous: the merged view is a function of the three slices
//! and the page scope only. Slices may have resolved in any order.
//!
//! Rules for in-scope tiers:
//! - data is a shallow union, tier3 over tier2 over tier1 on key collision
//! - a tier carrying an error contributes nothing but its error
//! - `agent_source` is the first non-empty source, tier1 first
//! - `confidence_score` comes from [`osa_core::confidence::combine`]

use crate::tier::{Tier, TierScope, TierSet, TierSlice};
use osa_core::confidence;
use serde::Serialize;
use serde_json::{Map, Value};

/// How the display layer should treat the merged view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    /// At least one in-scope tier is still loading
    Loading,
    /// Errors and no data from any tier
    Failed,
    /// Errors, but some tiers produced data
    Partial,
    /// No errors and no data
    Empty,
    /// Data and no errors
    Ready,
}

/// Error carried by one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierError {
    pub tier: Tier,
    pub message: String,
}

/// Merged view over up to three tiers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedViewModel {
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_source: Option<String>,
    /// 0–100
    pub confidence_score: u8,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<TierError>,
    pub state: ViewState,
}

impl MergedViewModel {
    /// Any in-scope tier reported an error
    #[inline]
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// No data and no error
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state == ViewState::Empty
    }
}

/// Merge with all three tiers in scope
#[must_use]
pub fn merge(tier1: &TierSlice, tier2: &TierSlice, tier3: &TierSlice) -> MergedViewModel {
    merge_scoped(TierScope::all(), tier1, tier2, tier3)
}

/// Merge only the tiers a page uses
#[must_use]
pub fn merge_scoped(
    scope: TierScope,
    tier1: &TierSlice,
    tier2: &TierSlice,
    tier3: &TierSlice,
) -> MergedViewModel {
    let slices = [(Tier::Tier1, tier1), (Tier::Tier2, tier2), (Tier::Tier3, tier3)];
    let in_scope = slices.iter().filter(|(tier, _)| scope.contains(*tier));

    let mut data = Map::new();
    let mut agent_source = None;
    let mut scores = Vec::with_capacity(3);
    let mut errors = Vec::new();
    let mut is_loading = false;

    for (tier, slice) in in_scope {
        is_loading |= slice.is_loading;

        if let Some(message) = &slice.error {
            errors.push(TierError {
                tier: *tier,
                message: message.clone(),
            });
            continue;
        }

        if let Some(tier_data) = &slice.data {
            for (key, value) in tier_data {
                data.insert(key.clone(), value.clone());
            }
        }
        if agent_source.is_none() {
            agent_source = slice
                .metadata
                .agent_source
                .as_deref()
                .map(str::trim)
                .filter(|source| !source.is_empty())
                .map(str::to_string);
        }
        scores.push(slice.metadata.confidence_score);
    }

    let state = if is_loading {
        ViewState::Loading
    } else if !errors.is_empty() {
        if data.is_empty() {
            ViewState::Failed
        } else {
            ViewState::Partial
        }
    } else if data.is_empty() {
        ViewState::Empty
    } else {
        ViewState::Ready
    };

    MergedViewModel {
        data,
        agent_source,
        confidence_score: confidence::combine(scores),
        is_loading,
        errors,
        state,
    }
}

impl TierSet {
    /// Merge this set for the given page scope
    #[inline]
    #[must_use]
    pub fn merge(&self, scope: TierScope) -> MergedViewModel {
        merge_scoped(scope, &self.tier1, &self.tier2, &self.tier3)
    }
}
