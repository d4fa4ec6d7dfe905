//! Model training configuration parsing from environment variables.

use super::parse_env;
use crate::domain::ml::model_kind::ModelKind;
use anyhow::{Context, Result};
use std::env;

/// Model environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEnvConfig {
    pub kind: ModelKind,
    pub test_ratio: f64,
    pub seed: u64,
    pub cv_folds: usize,
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        let kind = env::var("MODEL_KIND")
            .unwrap_or_else(|_| "linear".to_string())
            .parse::<ModelKind>()
            .context("Failed to parse MODEL_KIND")?;

        // Forest hyperparameters only apply to a forest
        let kind = match kind {
            ModelKind::RandomForest {
                n_trees,
                max_depth,
                min_samples_split,
            } => ModelKind::RandomForest {
                n_trees: parse_env("RF_N_TREES", n_trees)?,
                max_depth: parse_env("RF_MAX_DEPTH", max_depth)?,
                min_samples_split: parse_env("RF_MIN_SPLIT", min_samples_split)?,
            },
            other => other,
        };

        let test_ratio: f64 = parse_env("TEST_RATIO", 0.2)?;
        if !(0.0..1.0).contains(&test_ratio) {
            anyhow::bail!("TEST_RATIO must be in [0, 1), got {}", test_ratio);
        }

        Ok(Self {
            kind,
            test_ratio,
            seed: parse_env("RANDOM_SEED", 42)?,
            cv_folds: parse_env("CV_FOLDS", 0)?,
        })
    }
}
