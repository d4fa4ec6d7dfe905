//! Repository Pattern Abstractions
//!
//! Persistence seams for cached market data, keeping the cached provider
//! independent of the storage engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use stockcast::domain::repositories::BarRepository;
//! use stockcast::infrastructure::persistence::{Database, SqliteBarRepository};
//!
//! # async {
//! let db = Database::new("sqlite://data/stockcast.db").await.unwrap();
//! let repo = SqliteBarRepository::new(db.pool.clone());
//! // repo.save_bars(&ticker, Interval::OneDay, series.bars()).await?;
//! # };
//! ```

use crate::domain::market::interval::{DateRange, Interval, Ticker};
use crate::domain::market::price_series::PriceBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for cached price bars
#[async_trait]
pub trait BarRepository: Send + Sync {
    /// Upsert bars for a ticker/interval pair
    async fn save_bars(&self, ticker: &Ticker, interval: Interval, bars: &[PriceBar])
    -> Result<()>;

    /// Bars inside `[range.start, range.end)`, oldest first
    async fn get_bars(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
    ) -> Result<Vec<PriceBar>>;

    /// Record that `range` was fetched from the remote provider at `fetched_at`
    async fn record_fetch(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Forget logged fetches that overlap `range` (their ends stretched by
    /// `ttl`), so bars replaced by a newer fetch are never served as part of
    /// an older one. Returns how many entries were dropped.
    async fn invalidate_overlapping(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        ttl: chrono::Duration,
    ) -> Result<u64>;

    /// Whether a previous fetch covers `range`, tolerating `ttl` staleness at the end
    async fn covers(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        ttl: chrono::Duration,
    ) -> Result<bool>;
}
