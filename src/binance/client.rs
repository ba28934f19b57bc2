// =============================================================================
// Binance REST API Client — public market data
// =============================================================================
//
// Only the unauthenticated klines endpoint is used, so no API key or request
// signing is involved. Every response feeds the shared rate-limit tracker,
// and requests are refused locally once the used weight nears the cap.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::binance::rate_limit::RateLimitTracker;
use crate::market_data::candle::parse_kline_rows;
use crate::market_data::{Candle, CandleSource};
use crate::view::FetchWindow;

/// Request weight of one klines call.
const KLINES_WEIGHT: u32 = 2;
/// Largest page the klines endpoint returns.
const KLINES_LIMIT: u32 = 1000;
/// Interval requested for every calendar view.
const DAILY_INTERVAL: &str = "1d";

/// Binance REST API client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    /// Create a new `BinanceClient`.
    ///
    /// # Arguments
    /// * `base_url`   — e.g. `https://api.binance.com` (no trailing slash).
    /// * `timeout`    — per-request timeout.
    /// * `rate_limit` — tracker shared with the rest of the service.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        rate_limit: Arc<RateLimitTracker>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit,
        })
    }

    /// GET /api/v3/klines (public — no signature required).
    ///
    /// Returns candles parsed from Binance's array-of-arrays response format.
    /// Malformed rows are skipped; a non-2xx status fails the whole call.
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>> {
        if !self.rate_limit.can_send_request(KLINES_WEIGHT) {
            anyhow::bail!("local rate limit reached, refusing GET /api/v3/klines");
        }

        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={}&endTime={}&limit={}",
            self.base_url, symbol, interval, start_ms, end_ms, KLINES_LIMIT
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        // Error bodies are not always JSON (proxies answer with HTML), so the
        // status is checked against the raw text first.
        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("failed to read klines response body")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, text);
        }

        let body: serde_json::Value =
            serde_json::from_str(&text).context("failed to parse klines response")?;

        let candles = parse_kline_rows(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for BinanceClient {
    async fn daily_candles(&self, symbol: &str, window: FetchWindow) -> Result<Vec<Candle>> {
        self.get_klines(symbol, DAILY_INTERVAL, window.start_ms(), window.end_ms())
            .await
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}
