//! Regression metrics for return forecasts
//!
//! Metrics are computed twice for every evaluation: on the predicted
//! returns directly, and on close prices reconstructed as
//! `prev_close * (1 + predicted_return)`.

use super::predictor::Predictor;
use crate::domain::errors::EvaluationError;
use crate::domain::ml::feature_row::FeatureMatrix;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const R2_VARIANCE_EPS: f64 = 1e-10;
const MAPE_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub n: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// 0 when the actual values have (almost) no variance
    pub r2: f64,
    /// Percent; `None` when every actual value is ~0
    pub mape: Option<f64>,
    /// Share of rows where prediction and actual move the same way
    pub directional_accuracy: f64,
}

impl RegressionMetrics {
    /// Direction is the sign of each value.
    pub fn calculate(actual: &[f64], predicted: &[f64]) -> Result<Self, EvaluationError> {
        Self::calculate_against(actual, predicted, None)
    }

    /// Direction is measured relative to `baseline[i]` (e.g. the previous close)
    /// when given, otherwise relative to zero.
    pub fn calculate_against(
        actual: &[f64],
        predicted: &[f64],
        baseline: Option<&[f64]>,
    ) -> Result<Self, EvaluationError> {
        if actual.is_empty() {
            return Err(EvaluationError::Empty);
        }
        if actual.len() != predicted.len() {
            return Err(EvaluationError::LengthMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }
        if let Some(base) = baseline
            && base.len() != actual.len()
        {
            return Err(EvaluationError::LengthMismatch {
                actual: actual.len(),
                predicted: base.len(),
            });
        }
        if let Some(index) = actual
            .iter()
            .zip(predicted)
            .position(|(a, p)| !a.is_finite() || !p.is_finite())
        {
            return Err(EvaluationError::NonFinite { index });
        }

        let n = actual.len();
        let nf = n as f64;

        let mse = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum::<f64>()
            / nf;
        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / nf;

        let mean = actual.iter().sum::<f64>() / nf;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot < R2_VARIANCE_EPS {
            0.0
        } else {
            1.0 - (mse * nf) / ss_tot
        };

        let valid: Vec<(f64, f64)> = actual
            .iter()
            .zip(predicted)
            .filter(|(a, _)| a.abs() > MAPE_EPS)
            .map(|(a, p)| (*a, *p))
            .collect();
        let mape = if valid.is_empty() {
            None
        } else {
            Some(valid.iter().map(|(a, p)| ((a - p) / a).abs()).sum::<f64>() / valid.len() as f64 * 100.0)
        };

        let hits = (0..n)
            .filter(|&i| {
                let base = baseline.map(|b| b[i]).unwrap_or(0.0);
                (actual[i] - base).signum() == (predicted[i] - base).signum()
            })
            .count();

        Ok(Self {
            n,
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            mape,
            directional_accuracy: hits as f64 / nf,
        })
    }
}

/// One evaluated bar, written out for plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date: DateTime<Utc>,
    pub actual_close: f64,
    pub predicted_close: f64,
    pub actual_return: f64,
    pub predicted_return: f64,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub returns: RegressionMetrics,
    pub prices: RegressionMetrics,
    pub records: Vec<PredictionRecord>,
}

impl Evaluation {
    pub fn residuals(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.actual_return - r.predicted_return)
            .collect()
    }
}

pub struct Evaluator;

impl Evaluator {
    pub fn evaluate(predictor: &dyn Predictor, test: &FeatureMatrix) -> Result<Evaluation> {
        let predicted = predictor
            .predict(test)
            .with_context(|| format!("{} failed to predict {} rows", predictor.name(), test.len()))?;

        let actual = test.targets();
        let returns = RegressionMetrics::calculate(&actual, &predicted)
            .context("Failed to compute return metrics")?;

        let records: Vec<PredictionRecord> = test
            .rows
            .iter()
            .zip(&predicted)
            .map(|(row, p)| PredictionRecord {
                date: row.timestamp,
                actual_close: row.close,
                predicted_close: row.prev_close * (1.0 + p),
                actual_return: row.target,
                predicted_return: *p,
            })
            .collect();

        let actual_prices: Vec<f64> = records.iter().map(|r| r.actual_close).collect();
        let predicted_prices: Vec<f64> = records.iter().map(|r| r.predicted_close).collect();
        let prev_closes: Vec<f64> = test.rows.iter().map(|r| r.prev_close).collect();
        let prices = RegressionMetrics::calculate_against(
            &actual_prices,
            &predicted_prices,
            Some(&prev_closes),
        )
        .context("Failed to compute price metrics")?;

        info!(
            "Evaluator: {} rows, return RMSE={:.6}, price RMSE={:.4}, R²={:.4}",
            returns.n, returns.rmse, prices.rmse, returns.r2
        );

        Ok(Evaluation {
            returns,
            prices,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let m = RegressionMetrics::calculate(&actual, &actual).unwrap();
        assert_eq!(m.n, 4);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert!((m.r2 - 1.0).abs() < 1e-12);
        assert_eq!(m.mape, Some(0.0));
        assert_eq!(m.directional_accuracy, 1.0);
    }

    #[test]
    fn test_known_values() {
        let actual = [0.01, -0.02, 0.03, -0.01];
        let predicted = [0.02, -0.01, -0.01, -0.01];
        let m = RegressionMetrics::calculate(&actual, &predicted).unwrap();

        // errors: -0.01, -0.01, 0.04, 0
        assert!((m.mse - 0.00045).abs() < 1e-12);
        assert!((m.mae - 0.015).abs() < 1e-12);
        assert!((m.rmse - 0.00045_f64.sqrt()).abs() < 1e-12);
        assert_eq!(m.directional_accuracy, 0.75);
    }

    #[test]
    fn test_r2_zero_for_constant_actuals() {
        let m = RegressionMetrics::calculate(&[5.0, 5.0, 5.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.r2, 0.0);
        assert!(m.rmse.is_finite() && m.rmse >= 0.0);
    }

    #[test]
    fn test_mape_ignores_zero_actuals() {
        let m = RegressionMetrics::calculate(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
        assert_eq!(m.mape, None);

        let m = RegressionMetrics::calculate(&[0.0, 2.0], &[1.0, 1.0]).unwrap();
        assert_eq!(m.mape, Some(50.0));
    }

    #[test]
    fn test_direction_against_baseline() {
        let actual = [101.0, 99.0];
        let predicted = [100.5, 100.5];
        let baseline = [100.0, 100.0];
        let m = RegressionMetrics::calculate_against(&actual, &predicted, Some(&baseline)).unwrap();
        assert_eq!(m.directional_accuracy, 0.5);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            RegressionMetrics::calculate(&[], &[]),
            Err(EvaluationError::Empty)
        ));
        assert!(matches!(
            RegressionMetrics::calculate(&[1.0, 2.0], &[1.0]),
            Err(EvaluationError::LengthMismatch {
                actual: 2,
                predicted: 1
            })
        ));
        assert!(matches!(
            RegressionMetrics::calculate(&[1.0, 2.0], &[1.0, f64::NAN]),
            Err(EvaluationError::NonFinite { index: 1 })
        ));
    }
}
