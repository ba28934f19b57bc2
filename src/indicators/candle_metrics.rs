// =============================================================================
// Candle Metrics — volatility, change and direction of a single candle
// =============================================================================
//
//   volatility % = (high - low) / open * 100
//   change %     = (close - open) / open * 100
//
// Volatility tiers use the raw range ratio: < 1% low, < 3% medium, else high.

use serde::Serialize;

use super::round2;
use crate::market_data::Candle;
use crate::types::{Direction, VolatilityTier};

const MEDIUM_VOLATILITY: f64 = 0.01;
const HIGH_VOLATILITY: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandleMetrics {
    pub volatility_pct: Option<f64>,
    pub change_pct: Option<f64>,
    pub volatility: Option<VolatilityTier>,
    pub direction: Direction,
}

impl CandleMetrics {
    /// Percentages are absent when the open is not positive.
    pub fn from_candle(candle: &Candle) -> Self {
        let range_ratio = (candle.open > 0.0)
            .then(|| (candle.high - candle.low) / candle.open)
            .filter(|r| r.is_finite());
        let change_ratio = (candle.open > 0.0)
            .then(|| (candle.close - candle.open) / candle.open)
            .filter(|r| r.is_finite());

        Self {
            volatility_pct: range_ratio.map(|r| round2(r * 100.0)),
            change_pct: change_ratio.map(|r| round2(r * 100.0)),
            volatility: range_ratio.map(volatility_tier),
            direction: direction(candle),
        }
    }
}

pub fn volatility_tier(range_ratio: f64) -> VolatilityTier {
    if range_ratio < MEDIUM_VOLATILITY {
        VolatilityTier::Low
    } else if range_ratio < HIGH_VOLATILITY {
        VolatilityTier::Medium
    } else {
        VolatilityTier::High
    }
}

fn direction(candle: &Candle) -> Direction {
    if candle.close > candle.open {
        Direction::Up
    } else if candle.close < candle.open {
        Direction::Down
    } else {
        Direction::Flat
    }
}
