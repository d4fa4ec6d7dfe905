use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::MarketDataError;

/// Bar size of a historical price request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    OneMin,
    TwoMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    SixtyMin,
    NinetyMin,
    OneHour,
    OneDay,
    FiveDay,
    OneWeek,
    OneMonth,
    ThreeMonth,
}

impl Interval {
    /// Returns the nominal duration of one bar in seconds
    pub fn to_seconds(&self) -> i64 {
        match self {
            Interval::OneMin => 60,
            Interval::TwoMin => 120,
            Interval::FiveMin => 300,
            Interval::FifteenMin => 900,
            Interval::ThirtyMin => 1_800,
            Interval::SixtyMin | Interval::OneHour => 3_600,
            Interval::NinetyMin => 5_400,
            Interval::OneDay => 86_400,
            Interval::FiveDay => 5 * 86_400,
            Interval::OneWeek => 7 * 86_400,
            Interval::OneMonth => 30 * 86_400,
            Interval::ThreeMonth => 91 * 86_400,
        }
    }

    /// Converts to the Yahoo chart API interval string
    pub fn to_yahoo_string(&self) -> &'static str {
        match self {
            Interval::OneMin => "1m",
            Interval::TwoMin => "2m",
            Interval::FiveMin => "5m",
            Interval::FifteenMin => "15m",
            Interval::ThirtyMin => "30m",
            Interval::SixtyMin => "60m",
            Interval::NinetyMin => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDay => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonth => "3mo",
        }
    }

    pub fn is_intraday(&self) -> bool {
        self.to_seconds() < 86_400
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(Interval::OneMin),
            "2m" => Ok(Interval::TwoMin),
            "5m" => Ok(Interval::FiveMin),
            "15m" => Ok(Interval::FifteenMin),
            "30m" => Ok(Interval::ThirtyMin),
            "60m" => Ok(Interval::SixtyMin),
            "90m" => Ok(Interval::NinetyMin),
            "1h" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            "5d" => Ok(Interval::FiveDay),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            "3mo" => Ok(Interval::ThreeMonth),
            _ => Err(anyhow!(
                "Invalid interval: '{}'. Valid options: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo",
                s
            )),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_yahoo_string())
    }
}

/// Look-back period relative to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    /// Resolves the period into an absolute range ending at `now`
    pub fn resolve(&self, now: DateTime<Utc>) -> DateRange {
        let months = |n: u32| {
            now.checked_sub_months(Months::new(n))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        };

        let start = match self {
            Period::OneDay => now - Duration::days(1),
            Period::FiveDays => now - Duration::days(5),
            Period::OneMonth => months(1),
            Period::ThreeMonths => months(3),
            Period::SixMonths => months(6),
            Period::OneYear => months(12),
            Period::TwoYears => months(24),
            Period::FiveYears => months(60),
            Period::TenYears => months(120),
            Period::YearToDate => Utc
                .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            Period::Max => DateTime::<Utc>::UNIX_EPOCH,
        };

        DateRange { start, end: now }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y" => Ok(Period::OneYear),
            "2y" => Ok(Period::TwoYears),
            "5y" => Ok(Period::FiveYears),
            "10y" => Ok(Period::TenYears),
            "ytd" => Ok(Period::YearToDate),
            "max" => Ok(Period::Max),
            _ => Err(anyhow!(
                "Invalid period: '{}'. Valid options: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max",
                s
            )),
        }
    }
}

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, MarketDataError> {
        if start >= end {
            return Err(MarketDataError::InvalidRange {
                reason: format!("start {} is not before end {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from `YYYY-MM-DD` strings; the end date is inclusive.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, MarketDataError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| MarketDataError::InvalidRange {
                reason: format!("invalid date '{}': {}", s, e),
            })
        };
        let start_date = parse(start)?;
        let end_date = parse(end)?;

        let start_dt = start_date.and_time(chrono::NaiveTime::MIN).and_utc();
        let end_dt = (end_date + Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();

        Self::new(start_dt, end_dt)
    }
}

/// Validated, upper-cased ticker symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, MarketDataError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= 15
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'));

        if !valid {
            return Err(MarketDataError::InvalidTicker {
                ticker: raw.to_string(),
            });
        }

        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single historical price request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticker: Ticker,
    pub range: DateRange,
    pub interval: Interval,
}

impl HistoryRequest {
    pub fn for_period(ticker: Ticker, period: Period, interval: Interval) -> Self {
        Self {
            ticker,
            range: period.resolve(Utc::now()),
            interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_str() {
        assert_eq!(Interval::from_str("1d").unwrap(), Interval::OneDay);
        assert_eq!(Interval::from_str("1WK").unwrap(), Interval::OneWeek);
        assert_eq!(Interval::from_str("90m").unwrap(), Interval::NinetyMin);
        assert!(Interval::from_str("4h").is_err());
    }

    #[test]
    fn test_interval_yahoo_strings() {
        assert_eq!(Interval::OneDay.to_yahoo_string(), "1d");
        assert_eq!(Interval::OneMonth.to_yahoo_string(), "1mo");
        assert!(Interval::FifteenMin.is_intraday());
        assert!(!Interval::OneWeek.is_intraday());
    }

    #[test]
    fn test_period_resolve() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let one_year = Period::OneYear.resolve(now);
        assert_eq!(
            one_year.start,
            Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(one_year.end, now);

        let ytd = Period::YearToDate.resolve(now);
        assert_eq!(ytd.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        assert_eq!(Period::Max.resolve(now).start, DateTime::<Utc>::UNIX_EPOCH);
        assert!(Period::from_str("3y").is_err());
    }

    #[test]
    fn test_date_range_from_dates_is_end_inclusive() {
        let range = DateRange::from_dates("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::from_dates("2024-02-01", "2024-01-01").is_err());
        assert!(DateRange::from_dates("2024/01/01", "2024-02-01").is_err());
    }

    #[test]
    fn test_ticker_validation() {
        assert_eq!(Ticker::parse(" jpm ").unwrap().as_str(), "JPM");
        assert_eq!(Ticker::parse("BRK-B").unwrap().as_str(), "BRK-B");
        assert_eq!(Ticker::parse("^GSPC").unwrap().as_str(), "^GSPC");
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("AAPL MSFT").is_err());
        assert!(Ticker::parse("ABCDEFGHIJKLMNOP").is_err());
    }
}
