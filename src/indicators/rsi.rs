// =============================================================================
// Relative Strength Index (RSI) — simple sums over a trailing window
// =============================================================================
//
// Only the last `period` close-to-close moves are considered. No Wilder
// smoothing: every call recomputes from scratch.
//
// Step 1 — For each of the last `period` adjacent pairs, diff = close[i] - close[i-1].
// Step 2 — diff >= 0 adds to gains, diff < 0 adds |diff| to losses.
// Step 3 — losses == 0  => RSI = 100 (all strength, no division).
//          otherwise    => RS = gains / losses, RSI = 100 - 100 / (1 + RS)
// Step 4 — Round to 2 decimals.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

/// Default look-back used by the dashboard panel.
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute RSI over the last `period` moves of `closes`.
///
/// # Edge cases
/// - `period == 0` => `None`
/// - `closes.len() < period + 1` => `None` (need `period` moves)
/// - No losses in the window (including a flat window) => `Some(100.0)`
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), diff| {
            if diff >= 0.0 {
                (g + diff, l)
            } else {
                (g, l - diff)
            }
        });

    if losses == 0.0 {
        return Some(100.0);
    }

    let rs = gains / losses;
    let value = 100.0 - 100.0 / (1.0 + rs);
    value.is_finite().then(|| super::round2(value))
}

/// Human-readable zone for an RSI value.
pub fn rsi_label(value: f64) -> &'static str {
    if value >= 70.0 {
        "OVERBOUGHT"
    } else if value <= 30.0 {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}
