use crate::domain::errors::MarketDataError;
use crate::domain::market::interval::{HistoryRequest, Ticker};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::market::stock_info::StockInfo;
use async_trait::async_trait;

// Need async_trait for async functions in trait objects
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches historical bars; an `Ok` series is never empty and always ordered.
    async fn fetch_history(&self, request: &HistoryRequest)
    -> Result<PriceSeries, MarketDataError>;

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError>;

    /// Provider name for logs and metric labels
    fn name(&self) -> &str;
}
