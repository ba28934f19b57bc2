use std::cmp::Ordering;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::LiquidityTier;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
///
/// Raw candles come straight from the daily kline endpoint. Aggregated
/// candles reuse the same shape; their `time` is the time of the first
/// contributing raw candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Assigned by the liquidity classifier; `None` until then.
    pub liquidity: Option<LiquidityTier>,
}

impl Candle {
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
            liquidity: None,
        }
    }

    /// Reduce a group of candles to a single synthetic candle.
    ///
    /// Members are ordered with [`chronological`] first, so the result does
    /// not depend on the input order. Returns `None` for an empty group.
    pub fn reduce(members: &[Candle]) -> Option<Candle> {
        let mut sorted: Vec<&Candle> = members.iter().collect();
        sorted.sort_by(|a, b| chronological(a, b));

        let first = *sorted.first()?;
        let last = *sorted.last()?;

        let (high, low, volume) = sorted.iter().fold(
            (first.high, first.low, 0.0_f64),
            |(h, l, v), c| (h.max(c.high), l.min(c.low), v + c.volume),
        );

        Some(Candle::new(first.time, first.open, high, low, last.close, volume))
    }
}

impl AsRef<Candle> for Candle {
    fn as_ref(&self) -> &Candle {
        self
    }
}

/// Total order on candles: by time, then by values so that equal-timestamp
/// duplicates always sort the same way.
pub fn chronological(a: &Candle, b: &Candle) -> Ordering {
    a.time
        .cmp(&b.time)
        .then_with(|| a.open.total_cmp(&b.open))
        .then_with(|| a.high.total_cmp(&b.high))
        .then_with(|| a.low.total_cmp(&b.low))
        .then_with(|| a.close.total_cmp(&b.close))
        .then_with(|| a.volume.total_cmp(&b.volume))
}

// ---------------------------------------------------------------------------
// Kline row parsing (ingestion boundary)
// ---------------------------------------------------------------------------

/// Minimum number of fields a kline row needs:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume
const KLINE_MIN_FIELDS: usize = 6;

/// Parse a klines response body (array of arrays) into candles.
///
/// Rows that fail to parse are logged and skipped so one bad record never
/// poisons the rest of the series. A body that is not an array is an error.
pub fn parse_kline_rows(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for (idx, row) in raw.iter().enumerate() {
        match parse_kline_row(row) {
            Ok(candle) => candles.push(candle),
            Err(e) => warn!(row = idx, error = %e, "skipping malformed kline row"),
        }
    }

    debug!(rows = raw.len(), parsed = candles.len(), "kline rows parsed");
    Ok(candles)
}

/// Parse a single `[openTime, open, high, low, close, volume, ...]` row.
pub fn parse_kline_row(row: &serde_json::Value) -> Result<Candle> {
    let arr = row.as_array().context("kline row is not an array")?;
    if arr.len() < KLINE_MIN_FIELDS {
        anyhow::bail!("kline row has {} fields, need {KLINE_MIN_FIELDS}", arr.len());
    }

    let open_time = arr[0].as_i64().context("openTime is not an integer")?;
    let time = DateTime::<Utc>::from_timestamp_millis(open_time)
        .with_context(|| format!("openTime {open_time} out of range"))?;

    Ok(Candle::new(
        time,
        parse_string_f64(&arr[1], "open")?,
        parse_string_f64(&arr[2], "high")?,
        parse_string_f64(&arr[3], "low")?,
        parse_string_f64(&arr[4], "close")?,
        parse_string_f64(&arr[5], "volume")?,
    ))
}

/// Binance sends numeric values as JSON strings inside kline rows; plain
/// numbers are accepted too. Non-finite values are rejected.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    let v = match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    };
    if !v.is_finite() {
        anyhow::bail!("field {name} is not finite");
    }
    Ok(v)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
