// =============================================================================
// Liquidity Classifier
// =============================================================================
//
// A candle's liquidity tier is contextual: it depends on the largest volume in
// the set currently on screen, which callers always pass explicitly.
//
//   ratio = volume / max_volume
//   ratio < 0.3         => low
//   0.3 <= ratio < 0.7  => medium
//   ratio >= 0.7        => high
//
// A non-positive max volume (empty set, no volume data) yields ratio 0.
// =============================================================================

use crate::market_data::aggregator::AggregatedCandle;
use crate::types::LiquidityTier;

const MEDIUM_RATIO: f64 = 0.3;
const HIGH_RATIO: f64 = 0.7;

/// Classify `volume` against the largest volume in the comparison set.
pub fn classify_liquidity(volume: f64, max_volume: f64) -> LiquidityTier {
    let ratio = if max_volume > 0.0 {
        volume / max_volume
    } else {
        0.0
    };
    let ratio = if ratio.is_finite() { ratio } else { 0.0 };

    if ratio < MEDIUM_RATIO {
        LiquidityTier::Low
    } else if ratio < HIGH_RATIO {
        LiquidityTier::Medium
    } else {
        LiquidityTier::High
    }
}

/// Largest volume in the set, or 0.0 when the set is empty.
pub fn max_volume(series: &[AggregatedCandle]) -> f64 {
    series
        .iter()
        .map(|a| a.candle.volume)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max)
}

/// Assign a tier to every member of `series` relative to the series' own
/// maximum volume. Returns the maximum used.
pub fn annotate_liquidity(series: &mut [AggregatedCandle]) -> f64 {
    let max = max_volume(series);
    for agg in series.iter_mut() {
        agg.candle.liquidity = Some(classify_liquidity(agg.candle.volume, max));
    }
    max
}
