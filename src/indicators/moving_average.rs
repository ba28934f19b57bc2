// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA = mean of the last `period` closes, rounded to 2 decimals.

/// Default look-back used by the dashboard panel.
pub const DEFAULT_MA_PERIOD: usize = 20;

/// Average of the most recent `period` closes.
///
/// `closes` must already be time-ascending and end at the reference date.
///
/// # Edge cases
/// - `period == 0` => `None`
/// - `closes.len() < period` => `None`
pub fn moving_average(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let recent = &closes[closes.len() - period..];
    let mean = recent.iter().sum::<f64>() / period as f64;
    mean.is_finite().then(|| super::round2(mean))
}
