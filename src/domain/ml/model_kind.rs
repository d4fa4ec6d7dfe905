use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regression model family and its hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelKind {
    Linear,
    RandomForest {
        n_trees: usize,
        max_depth: u16,
        min_samples_split: usize,
    },
}

impl ModelKind {
    pub fn random_forest_default() -> Self {
        ModelKind::RandomForest {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
        }
    }

    /// Short identifier used in file names and metric labels
    pub fn slug(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::RandomForest { .. } => "random_forest",
        }
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "linear" | "ols" => Ok(ModelKind::Linear),
            "random-forest" | "rf" => Ok(ModelKind::random_forest_default()),
            _ => Err(anyhow!(
                "Invalid model kind: '{}'. Must be 'linear' or 'random-forest'",
                s
            )),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Linear => write!(f, "Linear Regression"),
            ModelKind::RandomForest {
                n_trees,
                max_depth,
                min_samples_split,
            } => write!(
                f,
                "Random Forest (Trees: {}, Depth: {}, MinSplit: {})",
                n_trees, max_depth, min_samples_split
            ),
        }
    }
}
