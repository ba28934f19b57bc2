// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard panel. Every public function returns `Option<T>` so callers are
// forced to handle insufficient-data and degenerate-denominator cases; a
// missing value is displayed as "no data", never as zero.

pub mod candle_metrics;
pub mod moving_average;
pub mod rsi;
pub mod summary;

pub use summary::{compute_indicators, IndicatorSummary};

/// Round to two decimal places, the precision every indicator is reported at.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
