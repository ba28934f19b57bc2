use anyhow::Result;
use async_trait::async_trait;

use crate::market_data::Candle;
use crate::view::FetchWindow;

/// Upstream provider of raw daily candles.
///
/// Implementations return candles already parsed into [`Candle`], with
/// malformed records dropped at their own ingestion boundary.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn daily_candles(&self, symbol: &str, window: FetchWindow) -> Result<Vec<Candle>>;
}
