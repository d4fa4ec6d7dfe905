use super::evaluator::RegressionMetrics;
use super::trainer::{CvSummary, FittedModel};
use crate::domain::market::interval::{Interval, Ticker};
use crate::domain::ml::feature_registry::FeatureSpec;
use crate::domain::ml::model_kind::ModelKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything needed to reuse a trained model: the fitted parameters plus
/// the feature recipe and the numbers it was judged by.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub run_id: Uuid,
    pub ticker: Ticker,
    pub kind: ModelKind,
    pub interval: Interval,
    pub trained_at: DateTime<Utc>,
    /// Timestamp of the last training row; later rows are out of sample
    pub trained_through: DateTime<Utc>,
    pub seed: u64,
    pub feature_spec: FeatureSpec,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_metrics: Option<RegressionMetrics>,
    pub cv: Option<CvSummary>,
    pub model: FittedModel,
}

impl ModelArtifact {
    /// `{TICKER}_{kind}_{YYYYMMDD_HHMMSS}.json`
    pub fn versioned_file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.ticker,
            self.kind.slug(),
            self.trained_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// `{TICKER}_{kind}.json`, replaced on every save
    pub fn fixed_file_name(&self) -> String {
        format!("{}_{}.json", self.ticker, self.kind.slug())
    }
}
