use crate::domain::market::price_series::PriceBar;
use tracing::warn;

/// Centralized validator for price bar integrity.
///
/// Rejects bars that are physically impossible (non-positive prices, inverted ranges).
pub struct StrictBarValidator;

impl StrictBarValidator {
    /// Returns the reason a bar is invalid, or `None` when it is usable.
    pub fn check(bar: &PriceBar) -> Option<String> {
        let prices = [bar.open, bar.high, bar.low, bar.close];

        if prices.iter().any(|p| !p.is_finite()) || !bar.volume.is_finite() {
            return Some("non-finite price or volume".to_string());
        }

        if prices.iter().any(|p| *p <= 0.0) {
            return Some("non-positive price component(s)".to_string());
        }

        if bar.low > bar.high {
            return Some(format!("low {} > high {}", bar.low, bar.high));
        }

        if bar.open < bar.low || bar.open > bar.high || bar.close < bar.low || bar.close > bar.high
        {
            return Some(format!(
                "open {} / close {} outside [{}, {}]",
                bar.open, bar.close, bar.low, bar.high
            ));
        }

        if bar.volume < 0.0 {
            return Some(format!("negative volume: {}", bar.volume));
        }

        None
    }

    /// Validates a bar, logging the reason on failure.
    pub fn validate(ticker: &str, bar: &PriceBar) -> bool {
        match Self::check(bar) {
            Some(reason) => {
                warn!(
                    "Validation FAILED: Bar for {} at {} rejected: {}",
                    ticker, bar.timestamp, reason
                );
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn test_validate_bar_positive() {
        assert!(StrictBarValidator::validate("JPM", &bar(200.0, 202.0, 199.0, 201.0, 1e6)));
    }

    #[test]
    fn test_validate_bar_negative_price() {
        assert!(!StrictBarValidator::validate("JPM", &bar(-1.0, 202.0, 199.0, 201.0, 1e6)));
    }

    #[test]
    fn test_validate_bar_invalid_low_high() {
        let b = bar(2000.0, 2000.0, 2001.0, 2000.0, 100.0);
        assert!(StrictBarValidator::check(&b).unwrap().contains("low"));
    }

    #[test]
    fn test_validate_bar_close_outside_range() {
        assert!(StrictBarValidator::check(&bar(200.0, 202.0, 199.0, 203.0, 1e6)).is_some());
    }

    #[test]
    fn test_validate_bar_nan_volume() {
        assert!(StrictBarValidator::check(&bar(200.0, 202.0, 199.0, 201.0, f64::NAN)).is_some());
    }
}
