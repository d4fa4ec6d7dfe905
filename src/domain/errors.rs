use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors related to market data acquisition
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Invalid ticker symbol: {ticker:?}")]
    InvalidTicker { ticker: String },

    #[error("Ticker not found: {ticker} ({reason})")]
    TickerNotFound { ticker: String, reason: String },

    #[error("No price data returned for {ticker}")]
    EmptyData { ticker: String },

    #[error("Provider unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Provider returned HTTP {status} for {ticker}: {body}")]
    HttpStatus {
        ticker: String,
        status: u16,
        body: String,
    },

    #[error("Malformed provider response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Invalid date range: {reason}")]
    InvalidRange { reason: String },
}

/// Errors related to price series integrity
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Price series for {ticker} is empty")]
    Empty { ticker: String },

    #[error("Price series for {ticker} is out of order: {current} follows {previous}")]
    OutOfOrder {
        ticker: String,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Price series for {ticker} has duplicate timestamp {timestamp}")]
    DuplicateTimestamp {
        ticker: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Invalid bar for {ticker} at {timestamp}: {reason}")]
    InvalidBar {
        ticker: String,
        timestamp: DateTime<Utc>,
        reason: String,
    },
}

/// Errors related to feature preparation
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Invalid feature spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("Not enough bars for features: need more than {lookback}, got {available}")]
    InsufficientRows { lookback: usize, available: usize },

    #[error("Feature {feature} is not finite at {timestamp}")]
    NonFinite {
        feature: String,
        timestamp: DateTime<Utc>,
    },
}

/// Errors related to model fitting and inference
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Not enough training rows: need {needed}, got {available}")]
    InsufficientRows { needed: usize, available: usize },

    #[error("Invalid train/test split: {reason}")]
    InvalidSplit { reason: String },

    #[error("Matrix construction failed: {reason}")]
    Matrix { reason: String },

    #[error("{model} fit failed: {reason}")]
    FitFailed { model: String, reason: String },

    #[error("Prediction failed: {reason}")]
    PredictFailed { reason: String },

    #[error("Feature mismatch: model expects {expected:?}, data has {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Errors related to metric computation
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Cannot evaluate an empty prediction set")]
    Empty,

    #[error("Length mismatch: {actual} actual values vs {predicted} predictions")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("Non-finite value at index {index}")]
    NonFinite { index: usize },
}
