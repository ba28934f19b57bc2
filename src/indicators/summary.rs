// =============================================================================
// Indicator Summary — MA + RSI over a trailing history window
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::moving_average::{moving_average, DEFAULT_MA_PERIOD};
use super::rsi::{rsi, rsi_label, DEFAULT_RSI_PERIOD};
use crate::market_data::candle::{chronological, Candle};

/// Maximum number of entries in a history window.
pub const DEFAULT_HISTORY_LEN: usize = 30;

/// Look-back settings for the indicator panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub history_len: usize,
    pub ma_period: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            history_len: DEFAULT_HISTORY_LEN,
            ma_period: DEFAULT_MA_PERIOD,
            rsi_period: DEFAULT_RSI_PERIOD,
        }
    }
}

/// Derived metrics for a selected calendar cell. `None` means "no data".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub moving_average: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_zone: Option<&'static str>,
}

/// Entries with `time <= reference`, oldest first, keeping at most the
/// `max_len` most recent.
pub fn history_window<T: AsRef<Candle>>(
    series: &[T],
    reference: DateTime<Utc>,
    max_len: usize,
) -> Vec<&T> {
    let mut window: Vec<&T> = series
        .iter()
        .filter(|c| c.as_ref().time <= reference)
        .collect();
    window.sort_by(|a, b| chronological(a.as_ref(), b.as_ref()));

    let start = window.len().saturating_sub(max_len);
    window.split_off(start)
}

/// Compute MA and RSI over the history window ending at `reference`.
pub fn compute_indicators<T: AsRef<Candle>>(
    history: &[T],
    reference: DateTime<Utc>,
    params: &IndicatorParams,
) -> IndicatorSummary {
    let closes: Vec<f64> = history_window(history, reference, params.history_len)
        .into_iter()
        .map(|c| c.as_ref().close)
        .collect();

    let rsi = rsi(&closes, params.rsi_period);
    IndicatorSummary {
        moving_average: moving_average(&closes, params.ma_period),
        rsi,
        rsi_zone: rsi.map(rsi_label),
    }
}
