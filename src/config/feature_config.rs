//! Feature preparation configuration parsing from environment variables.

use super::parse_env;
use crate::domain::ml::feature_registry::FeatureSpec;
use anyhow::{Context, Result};
use std::env;

/// Reads `FEATURE_LAGS`, `FEATURE_WINDOWS`, `RSI_PERIOD` and
/// `FEATURE_INCLUDE_VOLUME`, falling back to [`FeatureSpec::default`].
pub fn feature_spec_from_env() -> Result<FeatureSpec> {
    let defaults = FeatureSpec::default();

    let spec = FeatureSpec {
        lags: parse_list("FEATURE_LAGS", &defaults.lags)?,
        windows: parse_list("FEATURE_WINDOWS", &defaults.windows)?,
        rsi_period: parse_env("RSI_PERIOD", defaults.rsi_period)?,
        include_volume: parse_env("FEATURE_INCLUDE_VOLUME", defaults.include_volume)?,
    };

    spec.validate().context("Invalid feature configuration")?;
    Ok(spec)
}

/// Comma-separated list; an empty value yields an empty list
pub fn parse_list(key: &str, default: &[usize]) -> Result<Vec<usize>> {
    match env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .context(format!("Failed to parse {}", key)),
        Err(_) => Ok(default.to_vec()),
    }
}
