use crate::domain::errors::MarketDataError;
use crate::domain::market::interval::{HistoryRequest, Ticker};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::market::stock_info::StockInfo;
use crate::domain::ports::MarketDataProvider;
use crate::domain::repositories::BarRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serves history from the bar cache when a previous fetch covers the
/// request, otherwise delegates and stores the result.
///
/// Cache failures degrade to a remote fetch; they never fail the request.
pub struct CachedMarketDataService {
    inner: Arc<dyn MarketDataProvider>,
    repository: Arc<dyn BarRepository>,
    ttl: chrono::Duration,
}

impl CachedMarketDataService {
    pub fn new(
        inner: Arc<dyn MarketDataProvider>,
        repository: Arc<dyn BarRepository>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            inner,
            repository,
            ttl,
        }
    }

    async fn from_cache(&self, request: &HistoryRequest) -> Option<PriceSeries> {
        let covered = match self
            .repository
            .covers(&request.ticker, request.interval, &request.range, self.ttl)
            .await
        {
            Ok(covered) => covered,
            Err(e) => {
                warn!("BarCache: coverage lookup failed for {}: {}", request.ticker, e);
                return None;
            }
        };
        if !covered {
            debug!("BarCache: miss for {}", request.ticker);
            return None;
        }

        match self
            .repository
            .get_bars(&request.ticker, request.interval, &request.range)
            .await
        {
            Ok(bars) if !bars.is_empty() => match PriceSeries::new(request.ticker.clone(), bars) {
                Ok(series) => Some(series),
                Err(e) => {
                    warn!("BarCache: cached bars for {} rejected: {}", request.ticker, e);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                warn!("BarCache: read failed for {}: {}", request.ticker, e);
                None
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for CachedMarketDataService {
    async fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, MarketDataError> {
        if let Some(series) = self.from_cache(request).await {
            info!(
                "BarCache: served {} bars for {} from cache",
                series.len(),
                request.ticker
            );
            return Ok(series);
        }

        let series = self.inner.fetch_history(request).await?;

        // Older logged ranges overlapping this one now hold re-adjusted bars
        match self
            .repository
            .invalidate_overlapping(&request.ticker, request.interval, &request.range, self.ttl)
            .await
        {
            Ok(0) => {}
            Ok(n) => debug!(
                "BarCache: dropped {} overlapping fetch log entries for {}",
                n, request.ticker
            ),
            Err(e) => {
                warn!(
                    "BarCache: failed to invalidate fetch log for {}: {}",
                    request.ticker, e
                );
                return Ok(series);
            }
        }

        if let Err(e) = self
            .repository
            .save_bars(&request.ticker, request.interval, series.bars())
            .await
        {
            warn!("BarCache: failed to store bars for {}: {}", request.ticker, e);
        } else if let Err(e) = self
            .repository
            .record_fetch(&request.ticker, request.interval, &request.range, Utc::now())
            .await
        {
            warn!("BarCache: failed to log fetch for {}: {}", request.ticker, e);
        }

        Ok(series)
    }

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError> {
        self.inner.fetch_info(ticker).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
