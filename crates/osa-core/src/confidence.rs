//! Confidence calculator
//!
//! Collapses heterogeneous per-tier confidence inputs into one display score.
//! Inputs may be fractions (0–1), percentages (above 1), absent, or
//! non-finite. The calculator never fails: unusable input degrades to the
//! default score.

/// Score reported when no usable input exists
pub const DEFAULT_CONFIDENCE: u8 = 75;

/// Lowest score reported when at least one input exists
pub const MIN_CONFIDENCE: u8 = 60;

/// Highest score reported
pub const MAX_CONFIDENCE: u8 = 95;

/// Normalize one raw score onto the percentage scale
///
/// Values above 1 are already percentages; values at or below 1 are
/// fractions. Non-finite values are discarded.
#[inline]
#[must_use]
pub fn normalize(score: f64) -> Option<f64> {
    if !score.is_finite() {
        return None;
    }
    Some(if score > 1.0 { score } else { score * 100.0 })
}

/// Combine optional scores into an integer in `[MIN_CONFIDENCE, MAX_CONFIDENCE]`,
/// or exactly `DEFAULT_CONFIDENCE` when nothing usable was supplied
///
/// The best-attested signal wins: the maximum normalized value is clamped
/// and rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn combine<I>(scores: I) -> u8
where
    I: IntoIterator<Item = Option<f64>>,
{
    let best = scores
        .into_iter()
        .flatten()
        .filter_map(normalize)
        .fold(None, |best: Option<f64>, score| {
            Some(best.map_or(score, |b| b.max(score)))
        });

    match best {
        None => DEFAULT_CONFIDENCE,
        // within [60, 95] after the clamp, so the cast is exact
        Some(score) => score
            .clamp(f64::from(MIN_CONFIDENCE), f64::from(MAX_CONFIDENCE))
            .round() as u8,
    }
}
