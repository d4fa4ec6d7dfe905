use crate::domain::errors::SeriesError;
use crate::domain::market::interval::{Interval, Ticker};
use crate::domain::validation::data_quality::StrictBarValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One OHLCV record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Chronologically ordered bars for a single ticker.
///
/// Invariant: non-empty, timestamps strictly increasing, every bar valid.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: Ticker,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from bars that must already satisfy the invariant.
    pub fn new(ticker: Ticker, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty {
                ticker: ticker.to_string(),
            });
        }

        for bar in &bars {
            if let Some(reason) = StrictBarValidator::check(bar) {
                return Err(SeriesError::InvalidBar {
                    ticker: ticker.to_string(),
                    timestamp: bar.timestamp,
                    reason,
                });
            }
        }

        for pair in bars.windows(2) {
            let (prev, curr) = (pair[0].timestamp, pair[1].timestamp);
            if curr == prev {
                return Err(SeriesError::DuplicateTimestamp {
                    ticker: ticker.to_string(),
                    timestamp: curr,
                });
            }
            if curr < prev {
                return Err(SeriesError::OutOfOrder {
                    ticker: ticker.to_string(),
                    previous: prev,
                    current: curr,
                });
            }
        }

        Ok(Self { ticker, bars })
    }

    /// Sorts, de-duplicates (last bar wins) and drops invalid bars before building.
    pub fn from_unordered(ticker: Ticker, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        let total = bars.len();
        let mut by_time: BTreeMap<DateTime<Utc>, PriceBar> = BTreeMap::new();
        for bar in bars {
            if StrictBarValidator::validate(ticker.as_str(), &bar) {
                by_time.insert(bar.timestamp, bar);
            }
        }

        let cleaned: Vec<PriceBar> = by_time.into_values().collect();
        if cleaned.len() != total {
            warn!(
                "PriceSeries: {} kept {} of {} bars after cleaning",
                ticker,
                cleaned.len(),
                total
            );
        }

        Self::new(ticker, cleaned)
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first(&self) -> &PriceBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn head(&self, n: usize) -> &[PriceBar] {
        &self.bars[..n.min(self.bars.len())]
    }

    /// Interval whose nominal length is closest to the median bar spacing.
    /// Weekends and overnight gaps don't move the median. `None` for one bar.
    pub fn infer_interval(&self) -> Option<Interval> {
        const CANDIDATES: [Interval; 11] = [
            Interval::OneMin,
            Interval::TwoMin,
            Interval::FiveMin,
            Interval::FifteenMin,
            Interval::ThirtyMin,
            Interval::OneHour,
            Interval::NinetyMin,
            Interval::OneDay,
            Interval::OneWeek,
            Interval::OneMonth,
            Interval::ThreeMonth,
        ];

        let mut gaps: Vec<i64> = self
            .bars
            .windows(2)
            .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds())
            .collect();
        if gaps.is_empty() {
            return None;
        }
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2] as f64;

        CANDIDATES.into_iter().min_by(|a, b| {
            let da = (median / a.to_seconds() as f64).ln().abs();
            let db = (median / b.to_seconds() as f64).ln().abs();
            da.total_cmp(&db)
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar_at(day: i64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn ticker() -> Ticker {
        Ticker::parse("JPM").unwrap()
    }

    #[test]
    fn test_new_accepts_ordered_bars() {
        let series = PriceSeries::new(ticker(), vec![bar_at(0, 10.0), bar_at(1, 11.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![10.0, 11.0]);
        assert_eq!(series.last().close, 11.0);
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            PriceSeries::new(ticker(), vec![]),
            Err(SeriesError::Empty { .. })
        ));
    }

    #[test]
    fn test_new_rejects_duplicates_and_disorder() {
        assert!(matches!(
            PriceSeries::new(ticker(), vec![bar_at(1, 10.0), bar_at(1, 11.0)]),
            Err(SeriesError::DuplicateTimestamp { .. })
        ));
        assert!(matches!(
            PriceSeries::new(ticker(), vec![bar_at(2, 10.0), bar_at(1, 11.0)]),
            Err(SeriesError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_from_unordered_sorts_and_dedups() {
        let bars = vec![bar_at(2, 12.0), bar_at(0, 10.0), bar_at(2, 12.5), bar_at(1, 11.0)];
        let series = PriceSeries::from_unordered(ticker(), bars).unwrap();
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.5]);
    }

    #[test]
    fn test_from_unordered_drops_invalid_bars() {
        let mut broken = bar_at(1, 11.0);
        broken.low = 50.0;
        let series =
            PriceSeries::from_unordered(ticker(), vec![bar_at(0, 10.0), broken, bar_at(2, 12.0)])
                .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_infer_interval_from_spacing() {
        // Weekdays only: the weekend gaps are not the median
        let daily: Vec<PriceBar> = (0..30)
            .filter(|d| d % 7 < 5)
            .map(|d| bar_at(d, 10.0))
            .collect();
        let series = PriceSeries::new(ticker(), daily).unwrap();
        assert_eq!(series.infer_interval(), Some(Interval::OneDay));

        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        let hourly: Vec<PriceBar> = (0..20)
            .map(|h| PriceBar {
                timestamp: start + Duration::hours(h),
                ..bar_at(0, 10.0)
            })
            .collect();
        let series = PriceSeries::new(ticker(), hourly).unwrap();
        assert_eq!(series.infer_interval(), Some(Interval::OneHour));

        let weekly: Vec<PriceBar> = (0..10).map(|w| bar_at(w * 7, 10.0)).collect();
        let series = PriceSeries::new(ticker(), weekly).unwrap();
        assert_eq!(series.infer_interval(), Some(Interval::OneWeek));

        let single = PriceSeries::new(ticker(), vec![bar_at(0, 10.0)]).unwrap();
        assert_eq!(single.infer_interval(), None);
    }
}
