//! Live Yahoo Finance checks. Run with `cargo test -- --ignored`.

use stockcast::domain::errors::MarketDataError;
use stockcast::domain::market::interval::{HistoryRequest, Interval, Period, Ticker};
use stockcast::domain::ports::MarketDataProvider;
use stockcast::infrastructure::YahooMarketDataService;

#[tokio::test]
#[ignore]
async fn test_fetch_jpm_one_year() {
    let provider = YahooMarketDataService::builder().build();
    let request = HistoryRequest::for_period(
        Ticker::parse("JPM").unwrap(),
        Period::OneYear,
        Interval::OneDay,
    );

    let series = provider.fetch_history(&request).await.unwrap();
    assert!(series.len() > 200);
    assert!(
        series
            .bars()
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    );
}

#[tokio::test]
#[ignore]
async fn test_info_jpm() {
    let provider = YahooMarketDataService::builder().build();
    let info = provider
        .fetch_info(&Ticker::parse("JPM").unwrap())
        .await
        .unwrap();
    assert_eq!(info.symbol, "JPM");
    assert_eq!(info.currency.as_deref(), Some("USD"));
}

#[tokio::test]
#[ignore]
async fn test_unknown_ticker_is_not_found() {
    let provider = YahooMarketDataService::builder().build();
    let request = HistoryRequest::for_period(
        Ticker::parse("INVALIDTICKERXYZ").unwrap(),
        Period::OneMonth,
        Interval::OneDay,
    );

    let err = provider.fetch_history(&request).await.unwrap_err();
    assert!(matches!(err, MarketDataError::TickerNotFound { .. }));
}
