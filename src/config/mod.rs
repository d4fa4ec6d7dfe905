//! Configuration module for stockcast.
//!
//! Settings are layered: `.env` (loaded by the binary), environment variables
//! parsed per domain (Data, Features, Model, Observability), then an optional
//! TOML file overriding the feature and model sections. CLI flags are applied
//! last by the caller.

mod data_config;
mod feature_config;
mod model_config;
mod observability_config;

pub use data_config::{DataEnvConfig, DataSource};
pub use feature_config::{feature_spec_from_env, parse_list};
pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;

use crate::domain::ml::feature_registry::FeatureSpec;
use crate::domain::ml::model_kind::ModelKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataEnvConfig,
    pub features: FeatureSpec,
    pub model: ModelEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            data: DataEnvConfig::from_env()?,
            features: feature_spec_from_env()?,
            model: ModelEnvConfig::from_env()?,
            observability: ObservabilityEnvConfig::from_env(),
        })
    }

    /// Overlays the `[features]` and `[model]` tables of a TOML file.
    pub fn apply_toml(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        self.apply_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn apply_toml_str(&mut self, content: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(content).context("Failed to parse TOML")?;

        if let Some(features) = file.features {
            if let Some(lags) = features.lags {
                self.features.lags = lags;
            }
            if let Some(windows) = features.windows {
                self.features.windows = windows;
            }
            if let Some(rsi_period) = features.rsi_period {
                self.features.rsi_period = rsi_period;
            }
            if let Some(include_volume) = features.include_volume {
                self.features.include_volume = include_volume;
            }
            self.features
                .validate()
                .context("Invalid [features] section")?;
        }

        if let Some(model) = file.model {
            if let Some(kind) = model.kind {
                self.model.kind = kind.parse::<ModelKind>()?;
            }
            if let ModelKind::RandomForest {
                n_trees,
                max_depth,
                min_samples_split,
            } = &mut self.model.kind
            {
                if let Some(v) = model.n_trees {
                    *n_trees = v;
                }
                if let Some(v) = model.max_depth {
                    *max_depth = v;
                }
                if let Some(v) = model.min_samples_split {
                    *min_samples_split = v;
                }
            }
            if let Some(test_ratio) = model.test_ratio {
                if !(0.0..1.0).contains(&test_ratio) {
                    anyhow::bail!("test_ratio must be in [0, 1), got {}", test_ratio);
                }
                self.model.test_ratio = test_ratio;
            }
            if let Some(seed) = model.seed {
                self.model.seed = seed;
            }
            if let Some(cv_folds) = model.cv_folds {
                self.model.cv_folds = cv_folds;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    features: Option<FeatureSection>,
    model: Option<ModelSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureSection {
    lags: Option<Vec<usize>>,
    windows: Option<Vec<usize>>,
    rsi_period: Option<usize>,
    include_volume: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelSection {
    kind: Option<String>,
    test_ratio: Option<f64>,
    seed: Option<u64>,
    cv_folds: Option<usize>,
    n_trees: Option<usize>,
    max_depth: Option<u16>,
    min_samples_split: Option<usize>,
}

/// Parses `key` from the environment, falling back to `default` when unset.
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}
