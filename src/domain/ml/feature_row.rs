use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feature vector aligned to the bar it predicts.
///
/// Features are computed from bars strictly before `timestamp`; `target` is the
/// simple return from `prev_close` to `close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub features: Vec<f64>,
    pub target: f64,
    pub prev_close: f64,
    pub close: f64,
}

/// Feature rows plus the column names they were built with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.features.clone()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.target).collect()
    }

    /// Copies out a contiguous block of rows.
    pub fn slice(&self, start: usize, end: usize) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }
}
