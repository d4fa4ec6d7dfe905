//! Data acquisition and storage configuration parsing from environment variables.

use super::parse_env;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Which market data provider backs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Yahoo,
    Mock,
}

impl FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(DataSource::Yahoo),
            "mock" => Ok(DataSource::Mock),
            _ => anyhow::bail!("Invalid DATA_SOURCE: {}. Must be 'yahoo' or 'mock'", s),
        }
    }
}

/// Data environment configuration
#[derive(Debug, Clone)]
pub struct DataEnvConfig {
    pub source: DataSource,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,

    // Yahoo
    pub yahoo_base_url: String,
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub adjust_prices: bool,

    // Bar cache
    pub cache_enabled: bool,
    pub cache_database_url: String,
    pub cache_ttl_hours: i64,

    // Mock
    pub mock_seed: u64,
}

impl DataEnvConfig {
    pub fn from_env() -> Result<Self> {
        let source = env::var("DATA_SOURCE")
            .unwrap_or_else(|_| "yahoo".to_string())
            .parse::<DataSource>()
            .context("Failed to parse DATA_SOURCE")?;

        Ok(Self {
            source,
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            models_dir: PathBuf::from(
                env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string()),
            ),
            yahoo_base_url: env::var("YAHOO_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", 30)?,
            http_max_retries: parse_env("HTTP_MAX_RETRIES", 3)?,
            adjust_prices: parse_env("ADJUST_PRICES", true)?,
            cache_enabled: parse_env("CACHE_ENABLED", false)?,
            cache_database_url: env::var("CACHE_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/stockcast.db".to_string()),
            cache_ttl_hours: parse_env("CACHE_TTL_HOURS", 12)?,
            mock_seed: parse_env("MOCK_SEED", 7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_parsing() {
        assert_eq!(DataSource::from_str("YAHOO").unwrap(), DataSource::Yahoo);
        assert_eq!(DataSource::from_str("mock").unwrap(), DataSource::Mock);
        assert!(DataSource::from_str("bloomberg").is_err());
    }
}
