use crate::domain::errors::FeatureError;
use serde::{Deserialize, Serialize};

/// Which lagged and rolling features to derive from a price series.
///
/// The order of `feature_names()` is the column order of every feature matrix
/// and is stored with each trained model. Any change here invalidates saved models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Lags (in bars) of the simple return
    pub lags: Vec<usize>,
    /// Rolling windows for SMA ratio and volatility
    pub windows: Vec<usize>,
    pub rsi_period: usize,
    /// Adds a volume ratio over the first window
    pub include_volume: bool,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            lags: vec![1, 2, 3, 5, 10],
            windows: vec![5, 10, 20],
            rsi_period: 14,
            include_volume: true,
        }
    }
}

impl FeatureSpec {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.lags.is_empty() && self.windows.is_empty() {
            return Err(FeatureError::InvalidSpec {
                reason: "at least one lag or window is required".to_string(),
            });
        }
        if self.lags.contains(&0) {
            return Err(FeatureError::InvalidSpec {
                reason: "lags must be >= 1".to_string(),
            });
        }
        if self.windows.iter().any(|w| *w < 2) {
            return Err(FeatureError::InvalidSpec {
                reason: "windows must be >= 2".to_string(),
            });
        }
        if self.rsi_period == 0 {
            return Err(FeatureError::InvalidSpec {
                reason: "rsi_period must be >= 1".to_string(),
            });
        }
        if self.include_volume && self.windows.is_empty() {
            return Err(FeatureError::InvalidSpec {
                reason: "volume ratio needs a rolling window".to_string(),
            });
        }
        Ok(())
    }

    /// Number of leading bars consumed before the first feature row.
    pub fn lookback(&self) -> usize {
        let max_lag = self.lags.iter().max().copied().unwrap_or(0);
        let max_window = self.windows.iter().max().copied().unwrap_or(0);
        (max_lag + 1).max(max_window + 1).max(self.rsi_period + 1)
    }

    /// Ordered list of feature names.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.len());
        for lag in &self.lags {
            names.push(format!("return_lag_{}", lag));
        }
        for window in &self.windows {
            names.push(format!("sma_ratio_{}", window));
            names.push(format!("volatility_{}", window));
        }
        names.push(format!("rsi_{}", self.rsi_period));
        names.push("range_pct".to_string());
        if self.include_volume
            && let Some(first) = self.windows.first()
        {
            names.push(format!("volume_ratio_{}", first));
        }
        names
    }

    pub fn len(&self) -> usize {
        let volume = usize::from(self.include_volume && !self.windows.is_empty());
        self.lags.len() + 2 * self.windows.len() + 2 + volume
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
