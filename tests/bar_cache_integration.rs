use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stockcast::domain::errors::MarketDataError;
use stockcast::domain::market::interval::{DateRange, HistoryRequest, Interval, Ticker};
use stockcast::domain::market::price_series::{PriceBar, PriceSeries};
use stockcast::domain::market::stock_info::StockInfo;
use stockcast::domain::ports::MarketDataProvider;
use stockcast::domain::repositories::BarRepository;
use stockcast::infrastructure::persistence::{Database, SqliteBarRepository};
use stockcast::infrastructure::{CachedMarketDataService, MockMarketDataService};

/// Counts remote calls made through the cache
struct CountingProvider {
    inner: MockMarketDataService,
    calls: AtomicUsize,
}

#[async_trait]
impl MarketDataProvider for CountingProvider {
    async fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_history(request).await
    }

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError> {
        self.inner.fetch_info(ticker).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Returns the mock bars as-is on the first call and scaled afterwards, like
/// adjusted prices moving after a dividend.
struct RescalingProvider {
    inner: MockMarketDataService,
    calls: AtomicUsize,
    later_scale: f64,
}

#[async_trait]
impl MarketDataProvider for RescalingProvider {
    async fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, MarketDataError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let series = self.inner.fetch_history(request).await?;
        if call == 0 {
            return Ok(series);
        }
        let bars = scaled(series.bars(), self.later_scale);
        Ok(PriceSeries::new(series.ticker().clone(), bars).unwrap())
    }

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError> {
        self.inner.fetch_info(ticker).await
    }

    fn name(&self) -> &str {
        "rescaling"
    }
}

fn scaled(bars: &[PriceBar], scale: f64) -> Vec<PriceBar> {
    bars.iter()
        .map(|b| PriceBar {
            open: b.open * scale,
            high: b.high * scale,
            low: b.low * scale,
            close: b.close * scale,
            ..*b
        })
        .collect()
}

fn months(start: (u32, u32), end: (u32, u32)) -> HistoryRequest {
    HistoryRequest {
        ticker: Ticker::parse("JPM").unwrap(),
        range: DateRange::new(
            Utc.with_ymd_and_hms(2024, start.0, start.1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, end.0, end.1, 0, 0, 0).unwrap(),
        )
        .unwrap(),
        interval: Interval::OneDay,
    }
}

fn request(start_day: u32, end_day: u32) -> HistoryRequest {
    HistoryRequest {
        ticker: Ticker::parse("JPM").unwrap(),
        range: DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, end_day, 0, 0, 0).unwrap(),
        )
        .unwrap(),
        interval: Interval::OneDay,
    }
}

async fn setup() -> (Arc<CountingProvider>, Arc<SqliteBarRepository>, CachedMarketDataService) {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let repository = Arc::new(SqliteBarRepository::new(db.pool.clone()));
    let provider = Arc::new(CountingProvider {
        inner: MockMarketDataService::new(3),
        calls: AtomicUsize::new(0),
    });
    let cached =
        CachedMarketDataService::new(provider.clone(), repository.clone(), Duration::hours(12));
    (provider, repository, cached)
}

#[tokio::test]
async fn test_second_fetch_is_served_from_cache() {
    let (provider, _repo, cached) = setup().await;

    let first = cached.fetch_history(&request(1, 1)).await.unwrap();
    let second = cached.fetch_history(&request(1, 1)).await.unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.bars(), second.bars());
    assert_eq!(cached.name(), "counting");
}

#[tokio::test]
async fn test_sub_range_is_covered_but_wider_range_is_not() {
    let (provider, _repo, cached) = setup().await;

    cached.fetch_history(&request(5, 1)).await.unwrap();

    // Inside the logged range
    cached.fetch_history(&request(10, 1)).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // Starts before the logged range
    cached.fetch_history(&request(1, 1)).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_coverage_tolerates_ttl_at_the_end() {
    let (_provider, repo, _cached) = setup().await;
    let ticker = Ticker::parse("JPM").unwrap();
    let logged = request(1, 1).range;
    repo.record_fetch(&ticker, Interval::OneDay, &logged, Utc::now())
        .await
        .unwrap();

    let slightly_later = DateRange::new(logged.start, logged.end + Duration::hours(6)).unwrap();
    let much_later = DateRange::new(logged.start, logged.end + Duration::days(2)).unwrap();

    assert!(
        repo.covers(&ticker, Interval::OneDay, &slightly_later, Duration::hours(12))
            .await
            .unwrap()
    );
    assert!(
        !repo
            .covers(&ticker, Interval::OneDay, &much_later, Duration::hours(12))
            .await
            .unwrap()
    );
    assert!(
        !repo
            .covers(&ticker, Interval::OneWeek, &logged, Duration::hours(12))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_upsert_replaces_existing_bars() {
    let (_provider, repo, cached) = setup().await;
    let req = request(1, 1);
    let series = cached.fetch_history(&req).await.unwrap();

    let mut changed = series.bars().to_vec();
    changed[0].close *= 1.01;
    changed[0].high = changed[0].high.max(changed[0].close);
    repo.save_bars(&req.ticker, req.interval, &changed).await.unwrap();

    let stored = repo.get_bars(&req.ticker, req.interval, &req.range).await.unwrap();
    assert_eq!(stored.len(), series.len());
    assert_eq!(stored[0].close, changed[0].close);
}

#[tokio::test]
async fn test_overlapping_refetch_never_mixes_adjustments() {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let repository = Arc::new(SqliteBarRepository::new(db.pool.clone()));
    let provider = Arc::new(RescalingProvider {
        inner: MockMarketDataService::new(3),
        calls: AtomicUsize::new(0),
        later_scale: 0.9,
    });
    let cached = CachedMarketDataService::new(provider.clone(), repository, Duration::hours(12));

    let jan_to_mar = months((1, 1), (4, 1));
    cached.fetch_history(&jan_to_mar).await.unwrap();
    cached.fetch_history(&months((2, 1), (5, 1))).await.unwrap();

    // The overlapping fetch replaced part of Jan-Mar, so it must be fetched again
    let again = cached.fetch_history(&jan_to_mar).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

    let reference = MockMarketDataService::new(3)
        .fetch_history(&jan_to_mar)
        .await
        .unwrap();
    let expected = scaled(reference.bars(), 0.9);
    assert_eq!(again.len(), expected.len());
    for (got, want) in again.bars().iter().zip(&expected) {
        assert!((got.close - want.close).abs() < 1e-9, "bar at {}", got.timestamp);
    }

    // A fourth request is now served from the consistent cache
    let cached_again = cached.fetch_history(&jan_to_mar).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cached_again.bars(), again.bars());
}

#[tokio::test]
async fn test_invalidate_overlapping_keeps_disjoint_fetches() {
    let (_provider, repo, _cached) = setup().await;
    let ticker = Ticker::parse("JPM").unwrap();
    let jan = months((1, 1), (2, 1)).range;
    let jun = months((6, 1), (7, 1)).range;
    repo.record_fetch(&ticker, Interval::OneDay, &jan, Utc::now()).await.unwrap();
    repo.record_fetch(&ticker, Interval::OneDay, &jun, Utc::now()).await.unwrap();

    let overlapping = months((1, 15), (3, 1)).range;
    let dropped = repo
        .invalidate_overlapping(&ticker, Interval::OneDay, &overlapping, Duration::hours(12))
        .await
        .unwrap();

    assert_eq!(dropped, 1);
    assert!(!repo.covers(&ticker, Interval::OneDay, &jan, Duration::hours(12)).await.unwrap());
    assert!(repo.covers(&ticker, Interval::OneDay, &jun, Duration::hours(12)).await.unwrap());
}
