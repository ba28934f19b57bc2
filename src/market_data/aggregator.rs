// =============================================================================
// Candle Aggregator — daily candles into weekly / monthly rollups
// =============================================================================
//
// Candles are grouped by a typed period key in an ordered map so output is
// always sorted by period start. Each group is reduced with
// `Candle::reduce`: first open, last close, max high, min low, summed volume.
//
// Scope rules:
//   - Monthly: candles outside the scope year are dropped before grouping.
//   - Weekly:  a week is kept only if its start date lies in the scope month,
//              so a week straddling two months shows up in exactly one.
//   - Daily:   identity pass, one entry per raw candle.
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::market_data::candle::{chronological, Candle};
use crate::types::{Granularity, WeekStart};

/// Identifies the calendar period a candle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PeriodKey {
    Day { date: NaiveDate },
    Week { start: NaiveDate },
    Month { year: i32, month: u32 },
}

impl PeriodKey {
    /// Key of the period of `granularity` that contains `date`.
    pub fn containing(date: NaiveDate, granularity: Granularity, week_start: WeekStart) -> Self {
        match granularity {
            Granularity::Day => Self::Day { date },
            Granularity::Week => Self::Week {
                start: start_of_week(date, week_start),
            },
            Granularity::Month => Self::Month {
                year: date.year(),
                month: date.month(),
            },
        }
    }

    /// Display label used by the calendar grid.
    pub fn label(&self) -> String {
        match self {
            Self::Day { date } => date.format("%Y-%m-%d").to_string(),
            Self::Week { start } => format!("Week of {}", start.format("%b %-d")),
            Self::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_else(|| format!("{year}-{month:02}")),
        }
    }
}

/// First day of the week containing `date`.
///
/// Clamped to `NaiveDate::MIN` for the first partial week of the
/// representable range.
pub fn start_of_week(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = (date.weekday().num_days_from_monday() + 7
        - week_start.weekday().num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(u64::from(offset))).unwrap_or(NaiveDate::MIN)
}

/// Parameters that pin a view to a specific slice of the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewScope {
    pub year: i32,
    /// 1..=12. Ignored by the monthly view.
    pub month: u32,
    pub week_start: WeekStart,
}

/// A candle reduced from one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCandle {
    pub period: PeriodKey,
    pub label: String,
    /// Number of raw candles folded into this one.
    pub members: usize,
    #[serde(flatten)]
    pub candle: Candle,
}

impl AggregatedCandle {
    fn new(period: PeriodKey, members: usize, candle: Candle) -> Self {
        Self {
            label: period.label(),
            period,
            members,
            candle,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.candle.time
    }
}

impl AsRef<Candle> for AggregatedCandle {
    fn as_ref(&self) -> &Candle {
        &self.candle
    }
}

/// Group and reduce `candles` at `granularity`, honouring the view scope.
///
/// Output is ordered by period start and contains one entry per period that
/// has at least one member.
pub fn aggregate(
    candles: &[Candle],
    granularity: Granularity,
    scope: &ViewScope,
) -> Vec<AggregatedCandle> {
    let result: Vec<AggregatedCandle> = match granularity {
        Granularity::Day => {
            let mut sorted = candles.to_vec();
            sorted.sort_by(chronological);
            sorted
                .into_iter()
                .map(|c| {
                    let key = PeriodKey::Day {
                        date: c.time.date_naive(),
                    };
                    AggregatedCandle::new(key, 1, c)
                })
                .collect()
        }
        Granularity::Week => reduce_groups(group_by_period(candles, granularity, scope.week_start))
            .into_iter()
            .filter(|agg| match agg.period {
                PeriodKey::Week { start } => {
                    start.year() == scope.year && start.month() == scope.month
                }
                _ => false,
            })
            .collect(),
        Granularity::Month => {
            let in_year: Vec<Candle> = candles
                .iter()
                .filter(|c| c.time.year() == scope.year)
                .cloned()
                .collect();
            reduce_groups(group_by_period(&in_year, granularity, scope.week_start))
        }
    };

    debug!(
        input = candles.len(),
        output = result.len(),
        granularity = %granularity,
        "candles aggregated"
    );
    result
}

/// Bucket candles by the period that contains their date.
fn group_by_period(
    candles: &[Candle],
    granularity: Granularity,
    week_start: WeekStart,
) -> BTreeMap<PeriodKey, Vec<Candle>> {
    let mut groups: BTreeMap<PeriodKey, Vec<Candle>> = BTreeMap::new();
    for candle in candles {
        let key = PeriodKey::containing(candle.time.date_naive(), granularity, week_start);
        groups.entry(key).or_default().push(candle.clone());
    }
    groups
}

fn reduce_groups(groups: BTreeMap<PeriodKey, Vec<Candle>>) -> Vec<AggregatedCandle> {
    groups
        .into_iter()
        .filter_map(|(key, members)| {
            Candle::reduce(&members).map(|c| AggregatedCandle::new(key, members.len(), c))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use quickcheck_macros::quickcheck;

    fn day(y: i32, m: u32, d: u32, open: f64, high: f64, low: f64, close: f64, vol: f64) -> Candle {
        Candle::new(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(), open, high, low, close, vol)
    }

    fn flat(y: i32, m: u32, d: u32, vol: f64) -> Candle {
        day(y, m, d, 10.0, 11.0, 9.0, 10.0, vol)
    }

    fn scope(year: i32, month: u32) -> ViewScope {
        ViewScope {
            year,
            month,
            week_start: WeekStart::Sunday,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_sunday_and_monday() {
        // 2024-03-06 is a Wednesday.
        let wed = date(2024, 3, 6);
        assert_eq!(start_of_week(wed, WeekStart::Sunday), date(2024, 3, 3));
        assert_eq!(start_of_week(wed, WeekStart::Monday), date(2024, 3, 4));
        // A Sunday is its own week start under the Sunday convention.
        assert_eq!(start_of_week(date(2024, 3, 3), WeekStart::Sunday), date(2024, 3, 3));
        assert_eq!(start_of_week(date(2024, 3, 3), WeekStart::Monday), date(2024, 2, 26));
    }

    #[test]
    fn week_start_at_range_limit_does_not_underflow() {
        for ws in [WeekStart::Sunday, WeekStart::Monday] {
            let week = start_of_week(NaiveDate::MIN, ws);
            assert!(week == NaiveDate::MIN || week.weekday() == ws.weekday());
        }
    }

    #[test]
    fn labels() {
        assert_eq!(PeriodKey::Week { start: date(2024, 3, 3) }.label(), "Week of Mar 3");
        assert_eq!(PeriodKey::Month { year: 2024, month: 11 }.label(), "Nov");
        assert_eq!(PeriodKey::Day { date: date(2024, 1, 9) }.label(), "2024-01-09");
    }

    #[test]
    fn weekly_reduction() {
        let candles = vec![
            day(2024, 3, 3, 100.0, 110.0, 95.0, 105.0, 10.0),
            day(2024, 3, 4, 105.0, 120.0, 100.0, 115.0, 20.0),
            day(2024, 3, 5, 115.0, 118.0, 90.0, 96.0, 30.0),
            day(2024, 3, 10, 96.0, 99.0, 94.0, 98.0, 5.0),
        ];
        let weeks = aggregate(&candles, Granularity::Week, &scope(2024, 3));
        assert_eq!(weeks.len(), 2);

        let first = &weeks[0];
        assert_eq!(first.period, PeriodKey::Week { start: date(2024, 3, 3) });
        assert_eq!(first.members, 3);
        assert_eq!(first.candle.open, 100.0);
        assert_eq!(first.candle.close, 96.0);
        assert_eq!(first.candle.high, 120.0);
        assert_eq!(first.candle.low, 90.0);
        assert_eq!(first.candle.volume, 60.0);
        assert_eq!(first.label, "Week of Mar 3");

        assert_eq!(weeks[1].members, 1);
        assert_eq!(weeks[1].candle.close, 98.0);
    }

    #[test]
    fn boundary_week_belongs_to_month_of_its_start() {
        // Week of Sun 2024-03-31 runs into April.
        let candles = vec![
            flat(2024, 3, 31, 1.0),
            flat(2024, 4, 1, 2.0),
            flat(2024, 4, 2, 3.0),
            flat(2024, 4, 7, 4.0),
        ];

        let march = aggregate(&candles, Granularity::Week, &scope(2024, 3));
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].period, PeriodKey::Week { start: date(2024, 3, 31) });
        assert_eq!(march[0].candle.volume, 6.0);

        let april = aggregate(&candles, Granularity::Week, &scope(2024, 4));
        assert_eq!(april.len(), 1);
        assert_eq!(april[0].period, PeriodKey::Week { start: date(2024, 4, 7) });
    }

    #[test]
    fn weekly_view_respects_week_start_setting() {
        let candles = vec![flat(2024, 3, 3, 1.0), flat(2024, 3, 4, 2.0)];
        let monday = ViewScope {
            week_start: WeekStart::Monday,
            ..scope(2024, 3)
        };
        // Sunday 3rd belongs to the week of Mon Feb 26, which is not in March.
        let weeks = aggregate(&candles, Granularity::Week, &monday);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].period, PeriodKey::Week { start: date(2024, 3, 4) });
    }

    #[test]
    fn monthly_drops_other_years() {
        let candles = vec![
            flat(2023, 12, 30, 100.0),
            flat(2024, 1, 2, 1.0),
            flat(2024, 1, 3, 2.0),
            flat(2024, 2, 1, 3.0),
            flat(2025, 1, 1, 100.0),
        ];
        let months = aggregate(&candles, Granularity::Month, &scope(2024, 1));
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].period, PeriodKey::Month { year: 2024, month: 1 });
        assert_eq!(months[0].candle.volume, 3.0);
        assert_eq!(months[0].label, "Jan");
        assert_eq!(months[1].period, PeriodKey::Month { year: 2024, month: 2 });
    }

    #[test]
    fn monthly_round_trip_single_month() {
        let candles: Vec<Candle> = (1..=31)
            .map(|d| {
                let p = f64::from(d);
                day(2024, 5, d, p, p + 2.0, p - 1.0, p + 1.0, p)
            })
            .collect();
        let months = aggregate(&candles, Granularity::Month, &scope(2024, 5));
        assert_eq!(months.len(), 1);
        let expected = Candle::reduce(&candles).unwrap();
        assert_eq!(months[0].candle, expected);
        assert_eq!(months[0].members, 31);
        assert_eq!(expected.open, 1.0);
        assert_eq!(expected.close, 32.0);
        assert_eq!(expected.high, 33.0);
        assert_eq!(expected.low, 0.0);
    }

    #[test]
    fn daily_is_identity_in_time_order() {
        let candles = vec![flat(2024, 3, 2, 2.0), flat(2024, 3, 1, 1.0)];
        let days = aggregate(&candles, Granularity::Day, &scope(2024, 3));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].candle, candles[1]);
        assert_eq!(days[1].candle, candles[0]);
        assert!(days.iter().all(|d| d.members == 1));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        for g in [Granularity::Day, Granularity::Week, Granularity::Month] {
            assert!(aggregate(&[], g, &scope(2024, 3)).is_empty());
        }
    }

    // ---- properties ------------------------------------------------------

    /// Build candles spread over 2024 from arbitrary integer tuples. Integer
    /// valued floats keep volume sums exact regardless of order.
    fn arbitrary_candles(raw: &[(u16, u16, u16, u16, u16)]) -> Vec<Candle> {
        let jan1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        raw.iter()
            .map(|&(offset, a, b, c, vol)| {
                let time = jan1 + Duration::days(i64::from(offset % 366));
                let (lo, hi) = (f64::from(a.min(b)), f64::from(a.max(b)));
                let open = f64::from(c).clamp(lo, hi);
                let close = (lo + hi) / 2.0;
                Candle::new(time, open, hi, lo, close, f64::from(vol))
            })
            .collect()
    }

    #[quickcheck]
    fn grouping_conserves_members_and_volume(raw: Vec<(u16, u16, u16, u16, u16)>) -> bool {
        let candles = arbitrary_candles(&raw);
        let total: f64 = candles.iter().map(|c| c.volume).sum();

        [Granularity::Week, Granularity::Month].iter().all(|&g| {
            let groups = reduce_groups(group_by_period(&candles, g, WeekStart::Sunday));
            let members: usize = groups.iter().map(|a| a.members).sum();
            let volume: f64 = groups.iter().map(|a| a.candle.volume).sum();
            members == candles.len() && volume == total
        })
    }

    #[quickcheck]
    fn aggregates_bound_their_members(raw: Vec<(u16, u16, u16, u16, u16)>) -> bool {
        let candles = arbitrary_candles(&raw);
        let groups = group_by_period(&candles, Granularity::Week, WeekStart::Sunday);
        groups.values().all(|members| {
            let agg = Candle::reduce(members).unwrap();
            members.iter().all(|m| {
                agg.high >= m.open.max(m.close) && agg.low <= m.open.min(m.close)
            })
        })
    }

    #[quickcheck]
    fn monthly_view_covers_the_whole_year(raw: Vec<(u16, u16, u16, u16, u16)>) -> bool {
        // Every generated candle is in 2024, so nothing is discarded.
        let candles = arbitrary_candles(&raw);
        let months = aggregate(&candles, Granularity::Month, &scope(2024, 1));
        let members: usize = months.iter().map(|a| a.members).sum();
        let ordered = months.windows(2).all(|w| w[0].period < w[1].period);
        members == candles.len() && ordered
    }
}
