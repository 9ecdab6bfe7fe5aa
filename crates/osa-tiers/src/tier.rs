//! Tier slices, scopes and page paths

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One of the three nested data scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Section
    Tier1,
    /// Sub-section
    Tier2,
    /// Page
    Tier3,
}

impl Tier {
    /// Broadest first
    pub const ALL: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Tier::Tier1 => 0,
            Tier::Tier2 => 1,
            Tier::Tier3 => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Tier1 => "tier1",
            Tier::Tier2 => "tier2",
            Tier::Tier3 => "tier3",
        })
    }
}

/// Which tiers a page uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TierScope {
    tiers: [bool; 3],
}

impl TierScope {
    /// All three tiers
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self { tiers: [true; 3] }
    }

    /// Tier1 down to and including `deepest`
    #[inline]
    #[must_use]
    pub fn through(deepest: Tier) -> Self {
        let mut tiers = [false; 3];
        for slot in tiers.iter_mut().take(deepest.index() + 1) {
            *slot = true;
        }
        Self { tiers }
    }

    /// Exactly the given tiers
    #[must_use]
    pub fn only(tiers: &[Tier]) -> Self {
        let mut scope = Self { tiers: [false; 3] };
        for tier in tiers {
            scope.tiers[tier.index()] = true;
        }
        scope
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, tier: Tier) -> bool {
        self.tiers[tier.index()]
    }

    /// In-scope tiers, broadest first
    pub fn iter(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(|tier| self.contains(*tier))
    }
}

impl Default for TierScope {
    fn default() -> Self {
        Self::all()
    }
}

/// A results page addressed by its tier names
///
/// `TierPath::new("Strategy Plans").with_tier2("OSA")` addresses
/// `/engine/results/strategy-plans/osa`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TierPath {
    pub tier1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier3: Option<String>,
}

impl TierPath {
    /// Root of all results pages
    pub const ROOT: &'static str = "/engine/results";

    #[inline]
    #[must_use]
    pub fn new(tier1: impl Into<String>) -> Self {
        Self {
            tier1: tier1.into(),
            tier2: None,
            tier3: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_tier2(mut self, tier2: impl Into<String>) -> Self {
        self.tier2 = Some(tier2.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tier3(mut self, tier3: impl Into<String>) -> Self {
        self.tier3 = Some(tier3.into());
        self
    }

    /// Name of the given tier, if the page has one
    #[must_use]
    pub fn name(&self, tier: Tier) -> Option<&str> {
        match tier {
            Tier::Tier1 => Some(self.tier1.as_str()),
            Tier::Tier2 => self.tier2.as_deref(),
            Tier::Tier3 => self.tier3.as_deref(),
        }
    }

    /// Tiers named by this path
    #[must_use]
    pub fn scope(&self) -> TierScope {
        let named: Vec<Tier> = Tier::ALL
            .into_iter()
            .filter(|tier| self.name(*tier).is_some())
            .collect();
        TierScope::only(&named)
    }

    /// Slugged page path
    #[must_use]
    pub fn page_path(&self) -> String {
        let mut path = String::from(Self::ROOT);
        for tier in Tier::ALL {
            if let Some(name) = self.name(tier) {
                path.push('/');
                path.push_str(&slug(name));
            }
        }
        path
    }
}

impl fmt::Display for TierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.page_path())
    }
}

fn slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Provenance attached to a tier's data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_source: Option<String>,
    /// Fraction (0–1) or percentage; anything that is not a number is dropped
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_score: Option<f64>,
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

/// Data fetched for one tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierPayload {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub metadata: TierMetadata,
}

/// Display state of one tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSlice {
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub metadata: TierMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "isLoading")]
    pub is_loading: bool,
}

impl TierSlice {
    /// Fetch in flight
    #[inline]
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// Fetch resolved
    #[inline]
    #[must_use]
    pub fn loaded(payload: TierPayload) -> Self {
        Self {
            data: payload.data,
            metadata: payload.metadata,
            error: None,
            is_loading: false,
        }
    }

    /// Fetch failed after exhausting retries
    #[inline]
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Non-null, non-empty data
    #[inline]
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// The three slices for one page, replaced wholesale on refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierSet {
    pub tier1: TierSlice,
    pub tier2: TierSlice,
    pub tier3: TierSlice,
}

impl TierSet {
    /// Every in-scope tier loading, the rest idle
    #[must_use]
    pub fn loading(scope: TierScope) -> Self {
        let slice = |tier| {
            if scope.contains(tier) {
                TierSlice::loading()
            } else {
                TierSlice::default()
            }
        };
        Self {
            tier1: slice(Tier::Tier1),
            tier2: slice(Tier::Tier2),
            tier3: slice(Tier::Tier3),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, tier: Tier) -> &TierSlice {
        match tier {
            Tier::Tier1 => &self.tier1,
            Tier::Tier2 => &self.tier2,
            Tier::Tier3 => &self.tier3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_path_slugs_each_tier() {
        let path = TierPath::new("Strategy Plans")
            .with_tier2("OSA")
            .with_tier3("Quick Wins");
        assert_eq!(path.page_path(), "/engine/results/strategy-plans/osa/quick-wins");
        assert_eq!(path.scope(), TierScope::all());
    }

    #[test]
    fn scope_follows_named_tiers() {
        let path = TierPath::new("Analytics Insights").with_tier2("Content");
        let scope = path.scope();

        assert!(scope.contains(Tier::Tier1));
        assert!(scope.contains(Tier::Tier2));
        assert!(!scope.contains(Tier::Tier3));
        assert_eq!(scope, TierScope::through(Tier::Tier2));
    }

    #[test]
    fn slice_reads_loading_flag_in_camel_case() {
        let slice: TierSlice = serde_json::from_value(json!({
            "data": {"a": 1},
            "metadata": {"agent_source": "content_review", "confidence_score": 0.8},
            "isLoading": true,
        }))
        .unwrap();

        assert!(slice.is_loading);
        assert!(slice.has_data());
        assert_eq!(slice.metadata.confidence_score, Some(0.8));
    }

    #[test]
    fn non_numeric_confidence_is_dropped() {
        let metadata: TierMetadata =
            serde_json::from_value(json!({"confidence_score": "high"})).unwrap();
        assert_eq!(metadata.confidence_score, None);
    }

    #[test]
    fn loading_set_only_marks_scoped_tiers() {
        let set = TierSet::loading(TierScope::through(Tier::Tier1));
        assert!(set.tier1.is_loading);
        assert!(!set.tier2.is_loading);
        assert!(!set.tier3.is_loading);
    }
}
