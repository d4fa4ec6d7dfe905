use crate::domain::market::price_series::PriceSeries;
use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Min};

/// `describe()`-style statistics of the close series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single bar
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Plain-language figures derived from the summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStory {
    pub price_range: f64,
    /// Increase from the lowest to the highest close, in percent
    pub percent_increase: f64,
    pub iqr: f64,
    /// Coefficient of variation, in percent
    pub volatility_percent: f64,
}

impl SummaryStats {
    /// Statistics of the close prices. A valid series is never empty.
    pub fn of_closes(series: &PriceSeries) -> Self {
        Self::from_values(series.closes())
    }

    /// Returns all-zero stats for empty input.
    pub fn from_values(values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count: 0,
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                q25: 0.0,
                median: 0.0,
                q75: 0.0,
                max: 0.0,
            };
        }

        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let data = Data::new(values);
        let mean = data.mean().unwrap_or(0.0);
        let std = if count > 1 {
            data.std_dev().unwrap_or(0.0)
        } else {
            0.0
        };

        Self {
            count,
            mean,
            std,
            min: data.min(),
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: data.max(),
        }
    }

    pub fn story(&self) -> SummaryStory {
        let price_range = self.max - self.min;
        SummaryStory {
            price_range,
            percent_increase: if self.min > 0.0 {
                price_range / self.min * 100.0
            } else {
                0.0
            },
            iqr: self.q75 - self.q25,
            volatility_percent: if self.mean.abs() > f64::EPSILON {
                self.std / self.mean * 100.0
            } else {
                0.0
            },
        }
    }
}

/// Linear interpolation between closest ranks (pandas' default).
/// `sorted` must be ascending and non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
