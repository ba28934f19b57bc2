// =============================================================================
// Calendar View Pipeline
// =============================================================================
//
// Every view-state change (symbol, granularity, year/month) triggers a full,
// independent recomputation:
//
//   raw daily candles -> aggregate -> annotate liquidity -> CalendarView
//
// Selecting a cell then derives the panel snapshot (candle metrics plus
// MA / RSI over the trailing history) from the already computed view.
// Nothing here is cached between calls.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::indicators::candle_metrics::CandleMetrics;
use crate::indicators::summary::IndicatorParams;
use crate::indicators::{compute_indicators, IndicatorSummary};
use crate::market_data::aggregator::start_of_week;
use crate::market_data::{
    aggregate, annotate_liquidity, AggregatedCandle, Candle, PeriodKey, ViewScope,
};
use crate::types::{Granularity, WeekStart};

/// Days of history fetched before the first day of a daily / weekly view.
const MONTH_VIEW_LOOKBACK_DAYS: u64 = 30;
/// Days of history fetched before January 1st for the monthly view.
const YEAR_VIEW_LOOKBACK_DAYS: u64 = 60;
/// Range of calendar years a view may be opened on.
const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 9999;

// =============================================================================
// View state
// =============================================================================

/// What the dashboard is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub symbol: String,
    pub granularity: Granularity,
    pub year: i32,
    /// 1..=12. Always 1 for the monthly view, which spans the whole year.
    pub month: u32,
}

impl ViewState {
    /// Validate and build a view state. `month` is required for the daily
    /// and weekly views and ignored by the monthly one.
    pub fn new(
        symbol: impl Into<String>,
        granularity: Granularity,
        year: i32,
        month: Option<u32>,
    ) -> Result<Self> {
        let month = match (granularity, month) {
            (Granularity::Month, _) => 1,
            (_, Some(m)) if (1..=12).contains(&m) => m,
            (_, Some(m)) => anyhow::bail!("month {m} is outside 1..=12"),
            (_, None) => anyhow::bail!("month is required for the {granularity} view"),
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            anyhow::bail!("year {year} is outside {MIN_YEAR}..={MAX_YEAR}");
        }

        Ok(Self {
            symbol: symbol.into().trim().to_uppercase(),
            granularity,
            year,
            month,
        })
    }

    pub fn scope(&self, week_start: WeekStart) -> ViewScope {
        ViewScope {
            year: self.year,
            month: self.month,
            week_start,
        }
    }

    /// Upstream time range needed to render this view.
    ///
    /// Daily and weekly views reach back 30 days before the month (so the
    /// first cells have indicator history) and are padded out to whole weeks.
    /// The monthly view reaches back 60 days before the year.
    pub fn fetch_window(&self, week_start: WeekStart) -> Result<FetchWindow> {
        let (first, last) = match self.granularity {
            Granularity::Day | Granularity::Week => {
                let first_of_month = NaiveDate::from_ymd_opt(self.year, self.month, 1)
                    .context("invalid view month")?;
                let last_of_month = last_day_of_month(self.year, self.month)
                    .context("invalid view month")?;
                let lookback = first_of_month
                    .checked_sub_days(Days::new(MONTH_VIEW_LOOKBACK_DAYS))
                    .context("fetch window starts before the supported date range")?;
                let last_week_end = start_of_week(last_of_month, week_start)
                    .checked_add_days(Days::new(6))
                    .context("fetch window ends after the supported date range")?;
                (start_of_week(lookback, week_start), last_week_end)
            }
            Granularity::Month => {
                let jan1 =
                    NaiveDate::from_ymd_opt(self.year, 1, 1).context("invalid view year")?;
                let dec31 =
                    NaiveDate::from_ymd_opt(self.year, 12, 31).context("invalid view year")?;
                let lookback = jan1
                    .checked_sub_days(Days::new(YEAR_VIEW_LOOKBACK_DAYS))
                    .context("fetch window starts before the supported date range")?;
                (lookback, dec31)
            }
        };

        let end = end_of_day(last).context("fetch window ends after the supported date range")?;
        Ok(FetchWindow {
            start: start_of_day(first),
            end,
        })
    }
}

/// Inclusive upstream time range, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next?.pred_opt()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last millisecond of `date`. `None` past the end of the representable range.
fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    start_of_day(date)
        .checked_add_signed(Duration::days(1))?
        .checked_sub_signed(Duration::milliseconds(1))
}

// =============================================================================
// Derived views
// =============================================================================

/// Aggregated, liquidity-annotated candles for one view state.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView {
    pub symbol: String,
    pub granularity: Granularity,
    pub year: i32,
    /// `None` for the monthly view.
    pub month: Option<u32>,
    pub week_start: WeekStart,
    /// Largest volume among `candles`; the liquidity reference.
    pub max_volume: f64,
    pub candles: Vec<AggregatedCandle>,
}

/// Recompute the calendar view for `state` from raw daily candles.
pub fn recompute(state: &ViewState, raw: &[Candle], week_start: WeekStart) -> CalendarView {
    let mut candles = aggregate(raw, state.granularity, &state.scope(week_start));
    let max_volume = annotate_liquidity(&mut candles);

    debug!(
        symbol = %state.symbol,
        granularity = %state.granularity,
        cells = candles.len(),
        max_volume,
        "calendar view recomputed"
    );

    CalendarView {
        symbol: state.symbol.clone(),
        granularity: state.granularity,
        year: state.year,
        month: (state.granularity != Granularity::Month).then_some(state.month),
        week_start,
        max_volume,
        candles,
    }
}

/// Everything the dashboard panel shows for a selected cell.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub date: NaiveDate,
    pub period: PeriodKey,
    pub label: String,
    /// `None` when the view has no candle for the selected period.
    pub candle: Option<AggregatedCandle>,
    pub metrics: Option<CandleMetrics>,
    pub indicators: IndicatorSummary,
}

impl CalendarView {
    /// Whether `period` is one of the cells this view renders.
    ///
    /// Days must lie in the view month, weeks must start in it (a week
    /// straddling two months belongs to the month of its start) and months
    /// must lie in the view year.
    pub fn contains_period(&self, period: PeriodKey) -> bool {
        match period {
            PeriodKey::Day { date: d } | PeriodKey::Week { start: d } => {
                d.year() == self.year && Some(d.month()) == self.month
            }
            PeriodKey::Month { year, .. } => year == self.year,
        }
    }
}

/// Build the panel for the cell containing `date`.
///
/// History for the indicators is the view's own series up to the selected
/// period (or up to the end of `date` when that period has no data).
/// Fails when `date` is not inside one of the view's cells.
pub fn select(
    view: &CalendarView,
    date: NaiveDate,
    params: &IndicatorParams,
) -> Result<PanelSnapshot> {
    let period = PeriodKey::containing(date, view.granularity, view.week_start);
    if !view.contains_period(period) {
        anyhow::bail!(
            "{date} is outside the {} view of {}",
            view.granularity,
            match view.month {
                Some(m) => format!("{}-{m:02}", view.year),
                None => view.year.to_string(),
            }
        );
    }
    let entry = view.candles.iter().find(|c| c.period == period).cloned();

    let reference = match entry.as_ref() {
        Some(e) => e.time(),
        None => end_of_day(date).context("selected date is out of range")?,
    };
    let indicators = compute_indicators(&view.candles, reference, params);

    Ok(PanelSnapshot {
        date,
        period,
        label: period.label(),
        metrics: entry.as_ref().map(|e| CandleMetrics::from_candle(&e.candle)),
        candle: entry,
        indicators,
    })
}
