use crate::domain::errors::FeatureError;
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::ml::feature_registry::FeatureSpec;
use crate::domain::ml::feature_row::{FeatureMatrix, FeatureRow};
use ta::Next;
use ta::indicators::{RelativeStrengthIndex, SimpleMovingAverage, StandardDeviation};
use tracing::debug;

/// Indicator values after a given bar has been consumed
struct IndicatorSnapshot {
    sma: Vec<f64>,
    volatility: Vec<f64>,
    rsi: f64,
    volume_sma: f64,
}

/// Turns a price series into lagged/rolling feature rows.
pub struct FeatureBuilder {
    spec: FeatureSpec,
}

impl FeatureBuilder {
    pub fn new(spec: FeatureSpec) -> Result<Self, FeatureError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Builds one row per bar after the lookback window.
    ///
    /// Row `t` only reads bars `< t`, so `rows = bars - lookback`.
    pub fn build(&self, series: &PriceSeries) -> Result<FeatureMatrix, FeatureError> {
        let bars = series.bars();
        let lookback = self.spec.lookback();

        if bars.len() <= lookback {
            return Err(FeatureError::InsufficientRows {
                lookback,
                available: bars.len(),
            });
        }

        let returns = simple_returns(bars);
        let snapshots = self.indicator_snapshots(bars, &returns)?;
        let names = self.spec.feature_names();

        let mut rows = Vec::with_capacity(bars.len() - lookback);
        for t in lookback..bars.len() {
            let prev = &bars[t - 1];
            let snapshot = &snapshots[t - 1];
            let mut features = Vec::with_capacity(names.len());

            for lag in &self.spec.lags {
                features.push(returns[t - lag]);
            }

            for (i, _) in self.spec.windows.iter().enumerate() {
                features.push(prev.close / snapshot.sma[i] - 1.0);
                features.push(snapshot.volatility[i]);
            }

            features.push(snapshot.rsi / 100.0);
            features.push((prev.high - prev.low) / prev.close);

            if self.spec.include_volume {
                let ratio = if snapshot.volume_sma > 0.0 {
                    prev.volume / snapshot.volume_sma - 1.0
                } else {
                    0.0
                };
                features.push(ratio);
            }

            if let Some(idx) = features.iter().position(|v| !v.is_finite()) {
                return Err(FeatureError::NonFinite {
                    feature: names[idx].clone(),
                    timestamp: bars[t].timestamp,
                });
            }

            rows.push(FeatureRow {
                timestamp: bars[t].timestamp,
                features,
                target: returns[t],
                prev_close: prev.close,
                close: bars[t].close,
            });
        }

        debug!(
            "FeatureBuilder: {} built {} rows x {} features (lookback {})",
            series.ticker(),
            rows.len(),
            names.len(),
            lookback
        );

        Ok(FeatureMatrix { names, rows })
    }

    fn indicator_snapshots(
        &self,
        bars: &[PriceBar],
        returns: &[f64],
    ) -> Result<Vec<IndicatorSnapshot>, FeatureError> {
        let invalid = |e: ta::errors::TaError| FeatureError::InvalidSpec {
            reason: format!("{:?}", e),
        };

        let mut smas = self
            .spec
            .windows
            .iter()
            .map(|w| SimpleMovingAverage::new(*w).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        let mut vols = self
            .spec
            .windows
            .iter()
            .map(|w| StandardDeviation::new(*w).map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        let mut rsi = RelativeStrengthIndex::new(self.spec.rsi_period).map_err(invalid)?;
        let volume_window = self.spec.windows.first().copied().unwrap_or(2);
        let mut volume_sma = SimpleMovingAverage::new(volume_window).map_err(invalid)?;

        let mut snapshots = Vec::with_capacity(bars.len());
        let mut last_vol = vec![0.0; vols.len()];

        for (i, bar) in bars.iter().enumerate() {
            let sma = smas.iter_mut().map(|s| s.next(bar.close)).collect();
            // Returns start at bar 1
            if i > 0 {
                for (slot, vol) in last_vol.iter_mut().zip(vols.iter_mut()) {
                    *slot = vol.next(returns[i]);
                }
            }

            snapshots.push(IndicatorSnapshot {
                sma,
                volatility: last_vol.clone(),
                rsi: rsi.next(bar.close),
                volume_sma: volume_sma.next(bar.volume),
            });
        }

        Ok(snapshots)
    }
}

/// `returns[i] = close[i] / close[i-1] - 1`, with `returns[0] = 0`.
pub fn simple_returns(bars: &[PriceBar]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(bars.len());
    returns.push(0.0);
    for pair in bars.windows(2) {
        returns.push(pair[1].close / pair[0].close - 1.0);
    }
    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::interval::Ticker;
    use chrono::{Duration, TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceBar {
                timestamp: start + Duration::days(i as i64),
                open: *c,
                high: c * 1.01,
                low: c * 0.99,
                close: *c,
                volume: 1_000.0 + i as f64,
            })
            .collect();
        PriceSeries::new(Ticker::parse("TEST").unwrap(), bars).unwrap()
    }

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn test_row_count_is_input_minus_lookback() {
        let builder = FeatureBuilder::new(FeatureSpec::default()).unwrap();
        let series = series_from_closes(&wavy_closes(60));
        let matrix = builder.build(&series).unwrap();

        assert_eq!(matrix.len(), 60 - builder.spec().lookback());
        assert_eq!(matrix.n_features(), builder.spec().len());
        assert!(matrix.rows.iter().all(|r| r.features.len() == matrix.n_features()));
    }

    #[test]
    fn test_lag_feature_matches_past_return() {
        let spec = FeatureSpec {
            lags: vec![1, 2],
            windows: vec![3],
            rsi_period: 3,
            include_volume: false,
        };
        let closes = wavy_closes(10);
        let builder = FeatureBuilder::new(spec).unwrap();
        let matrix = builder.build(&series_from_closes(&closes)).unwrap();

        // lookback = 4, so the first row predicts bar 4
        let row = &matrix.rows[0];
        let lag1 = closes[3] / closes[2] - 1.0;
        let lag2 = closes[2] / closes[1] - 1.0;
        assert!((row.features[0] - lag1).abs() < 1e-12);
        assert!((row.features[1] - lag2).abs() < 1e-12);
        assert!((row.target - (closes[4] / closes[3] - 1.0)).abs() < 1e-12);
        assert_eq!(row.prev_close, closes[3]);
        assert_eq!(row.close, closes[4]);

        let sma3 = (closes[1] + closes[2] + closes[3]) / 3.0;
        assert!((row.features[2] - (closes[3] / sma3 - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_features_do_not_look_ahead() {
        let builder = FeatureBuilder::new(FeatureSpec::default()).unwrap();
        let closes = wavy_closes(40);
        let base = builder.build(&series_from_closes(&closes)).unwrap();

        let mut shocked = closes.clone();
        let last = shocked.len() - 1;
        shocked[last] *= 1.5;
        let changed = builder.build(&series_from_closes(&shocked)).unwrap();

        let a = base.rows.last().unwrap();
        let b = changed.rows.last().unwrap();
        assert_eq!(a.features, b.features);
        assert!(b.target > a.target);
    }

    #[test]
    fn test_insufficient_rows() {
        let builder = FeatureBuilder::new(FeatureSpec::default()).unwrap();
        let series = series_from_closes(&wavy_closes(21));
        assert!(matches!(
            builder.build(&series),
            Err(FeatureError::InsufficientRows {
                lookback: 21,
                available: 21
            })
        ));
    }

    #[test]
    fn test_simple_returns() {
        let series = series_from_closes(&[100.0, 110.0, 99.0]);
        let returns = simple_returns(series.bars());
        assert_eq!(returns.len(), 3);
        assert_eq!(returns[0], 0.0);
        assert!((returns[1] - 0.1).abs() < 1e-12);
        assert!((returns[2] + 0.1).abs() < 1e-12);
    }
}
