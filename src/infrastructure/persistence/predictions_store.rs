use crate::application::ml::evaluator::PredictionRecord;
use crate::domain::market::interval::Ticker;
use crate::domain::ml::model_kind::ModelKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Actual-vs-predicted series for plotting, under `{data_dir}/predictions`
pub struct PredictionsStore {
    dir: PathBuf,
}

impl PredictionsStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("predictions"),
        }
    }

    pub fn path_for(&self, ticker: &Ticker, kind: &ModelKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}_predictions.csv", ticker, kind.slug()))
    }

    pub fn save(
        &self,
        ticker: &Ticker,
        kind: &ModelKind,
        records: &[PredictionRecord],
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(ticker, kind);

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!("Saved {} predictions to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Vec<PredictionRecord>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<PredictionRecord>, _>>()
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}
