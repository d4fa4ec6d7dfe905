use super::common::{ChartResponse, ChartResult};
use crate::domain::errors::{MarketDataError, SeriesError};
use crate::domain::market::interval::{HistoryRequest, Ticker};
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::market::stock_info::StockInfo;
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, build_url_with_query, percent_encode,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Longest error body kept in `HttpStatus`
const MAX_ERROR_BODY: usize = 200;

// ===== Market Data Service (chart API) =====

pub struct YahooMarketDataService {
    client: ClientWithMiddleware,
    base_url: String,
    adjust_prices: bool,
}

impl YahooMarketDataService {
    pub fn builder() -> YahooMarketDataServiceBuilder {
        YahooMarketDataServiceBuilder::default()
    }

    fn chart_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            percent_encode(ticker.as_str())
        )
    }

    async fn get_chart(
        &self,
        ticker: &Ticker,
        params: &[(&str, String)],
    ) -> Result<ChartResult, MarketDataError> {
        let url = build_url_with_query(&self.chart_url(ticker), params);
        debug!("YahooMarketData: GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Unreachable {
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::Unreachable {
                reason: format!("failed to read response body: {}", e),
            })?;

        parse_chart(ticker, status, &body)
    }
}

/// Maps a raw chart response (status + body) to its first result.
pub fn parse_chart(ticker: &Ticker, status: u16, body: &str) -> Result<ChartResult, MarketDataError> {
    let parsed = serde_json::from_str::<ChartResponse>(body);

    if !(200..300).contains(&status) {
        if let Ok(response) = &parsed
            && let Some(error) = &response.chart.error
            && error.is_not_found()
        {
            return Err(MarketDataError::TickerNotFound {
                ticker: ticker.to_string(),
                reason: error.description.clone().unwrap_or_else(|| error.code.clone()),
            });
        }
        return Err(MarketDataError::HttpStatus {
            ticker: ticker.to_string(),
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    let response = parsed.map_err(|e| MarketDataError::MalformedResponse {
        reason: e.to_string(),
    })?;

    if let Some(error) = response.chart.error {
        if error.is_not_found() {
            return Err(MarketDataError::TickerNotFound {
                ticker: ticker.to_string(),
                reason: error.description.unwrap_or(error.code),
            });
        }
        return Err(MarketDataError::MalformedResponse {
            reason: format!(
                "{}: {}",
                error.code,
                error.description.unwrap_or_default()
            ),
        });
    }

    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| MarketDataError::EmptyData {
            ticker: ticker.to_string(),
        })
}

/// Converts chart columns to a series, skipping rows with any null OHLCV.
///
/// With `adjust_prices`, OHLC are scaled by `adjclose / close`.
pub fn bars_from_chart(
    ticker: &Ticker,
    chart: &ChartResult,
    adjust_prices: bool,
) -> Result<PriceSeries, MarketDataError> {
    let empty = || MarketDataError::EmptyData {
        ticker: ticker.to_string(),
    };

    let quote = chart.indicators.quote.first().ok_or_else(empty)?;
    let adjclose = chart
        .indicators
        .adjclose
        .as_ref()
        .and_then(|blocks| blocks.first())
        .map(|block| &block.adjclose);

    let column = |values: &Vec<Option<f64>>, i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(chart.timestamp.len());
    let mut skipped = 0usize;

    for (i, ts) in chart.timestamp.iter().enumerate() {
        let row = (
            column(&quote.open, i),
            column(&quote.high, i),
            column(&quote.low, i),
            column(&quote.close, i),
            column(&quote.volume, i),
            Utc.timestamp_opt(*ts, 0).single(),
        );
        let (Some(open), Some(high), Some(low), Some(close), Some(volume), Some(timestamp)) = row
        else {
            skipped += 1;
            continue;
        };

        let factor = match adjclose.and_then(|adj| column(adj, i)) {
            Some(adj) if adjust_prices && close > 0.0 => adj / close,
            _ => 1.0,
        };

        bars.push(PriceBar {
            timestamp,
            open: open * factor,
            high: high * factor,
            low: low * factor,
            close: close * factor,
            volume,
        });
    }

    if skipped > 0 {
        debug!("YahooMarketData: {} skipped {} incomplete rows", ticker, skipped);
    }

    PriceSeries::from_unordered(ticker.clone(), bars).map_err(|e| match e {
        SeriesError::Empty { .. } => empty(),
        other => MarketDataError::MalformedResponse {
            reason: other.to_string(),
        },
    })
}

pub fn info_from_chart(ticker: &Ticker, chart: &ChartResult) -> StockInfo {
    let meta = &chart.meta;
    StockInfo {
        symbol: if meta.symbol.is_empty() {
            ticker.to_string()
        } else {
            meta.symbol.clone()
        },
        long_name: meta.long_name.clone().or_else(|| meta.short_name.clone()),
        exchange: meta
            .full_exchange_name
            .clone()
            .or_else(|| meta.exchange_name.clone()),
        currency: meta.currency.clone(),
        instrument_type: meta.instrument_type.clone(),
        // Not part of the chart payload
        sector: None,
        industry: None,
        market_cap: None,
        last_price: meta.regular_market_price,
    }
}

#[async_trait]
impl MarketDataProvider for YahooMarketDataService {
    async fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, MarketDataError> {
        let params = [
            ("period1", request.range.start.timestamp().to_string()),
            ("period2", request.range.end.timestamp().to_string()),
            ("interval", request.interval.to_yahoo_string().to_string()),
            ("includeAdjustedClose", "true".to_string()),
            ("events", "div,split".to_string()),
        ];

        let chart = self.get_chart(&request.ticker, &params).await?;
        let series = bars_from_chart(&request.ticker, &chart, self.adjust_prices)?;

        info!(
            "YahooMarketData: fetched {} bars for {} ({} .. {})",
            series.len(),
            request.ticker,
            series.first().timestamp,
            series.last().timestamp
        );
        Ok(series)
    }

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError> {
        let params = [
            ("range", "1d".to_string()),
            ("interval", "1d".to_string()),
        ];
        let chart = self.get_chart(ticker, &params).await?;
        let info = info_from_chart(ticker, &chart);
        if info.long_name.is_none() {
            warn!("YahooMarketData: no company name in chart metadata for {}", ticker);
        }
        Ok(info)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[derive(Default)]
pub struct YahooMarketDataServiceBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    adjust_prices: Option<bool>,
}

impl YahooMarketDataServiceBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn adjust_prices(mut self, adjust_prices: bool) -> Self {
        self.adjust_prices = Some(adjust_prices);
        self
    }

    pub fn build(self) -> YahooMarketDataService {
        let client = HttpClientFactory::create_client(
            self.timeout_secs.unwrap_or(30),
            self.max_retries.unwrap_or(3),
        );

        YahooMarketDataService {
            client,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            adjust_prices: self.adjust_prices.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker() -> Ticker {
        Ticker::parse("JPM").unwrap()
    }

    const VALID: &str = r#"{"chart":{"result":[{"meta":{"symbol":"JPM","currency":"USD","exchangeName":"NYQ","fullExchangeName":"NYSE","instrumentType":"EQUITY","longName":"JPMorgan Chase & Co.","regularMarketPrice":187.5},"timestamp":[1704205800,1704292200,1704378600],"indicators":{"quote":[{"open":[185.0,null,187.0],"high":[186.0,null,188.0],"low":[184.0,null,186.0],"close":[185.5,null,187.5],"volume":[1000000,null,1200000]}],"adjclose":[{"adjclose":[181.79,null,183.75]}]}}],"error":null}}"#;

    #[test]
    fn test_parse_valid_response_skips_nulls() {
        let chart = parse_chart(&ticker(), 200, VALID).unwrap();
        let series = bars_from_chart(&ticker(), &chart, false).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 185.5);
        assert_eq!(series.bars()[1].volume, 1_200_000.0);
        assert!(series.bars()[0].timestamp < series.bars()[1].timestamp);
    }

    #[test]
    fn test_adjusted_prices_use_adjclose_ratio() {
        let chart = parse_chart(&ticker(), 200, VALID).unwrap();
        let series = bars_from_chart(&ticker(), &chart, true).unwrap();
        let bar = series.bars()[0];
        let factor = 181.79 / 185.5;
        assert!((bar.close - 181.79).abs() < 1e-9);
        assert!((bar.open - 185.0 * factor).abs() < 1e-9);
        assert!((bar.high - 186.0 * factor).abs() < 1e-9);
    }

    #[test]
    fn test_info_from_meta() {
        let chart = parse_chart(&ticker(), 200, VALID).unwrap();
        let info = info_from_chart(&ticker(), &chart);
        assert_eq!(info.symbol, "JPM");
        assert_eq!(info.long_name.as_deref(), Some("JPMorgan Chase & Co."));
        assert_eq!(info.exchange.as_deref(), Some("NYSE"));
        assert_eq!(info.currency.as_deref(), Some("USD"));
        assert_eq!(info.last_price, Some(187.5));
        assert!(info.market_cap.is_none());
    }

    #[test]
    fn test_not_found_maps_to_ticker_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(&Ticker::parse("INVALID").unwrap(), 404, body).unwrap_err();
        assert!(matches!(err, MarketDataError::TickerNotFound { .. }));
        assert!(err.to_string().contains("INVALID"));
    }

    #[test]
    fn test_other_status_maps_to_http_status() {
        let err = parse_chart(&ticker(), 429, "Too Many Requests").unwrap_err();
        assert!(matches!(
            err,
            MarketDataError::HttpStatus { status: 429, .. }
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_chart(&ticker(), 200, "not json"),
            Err(MarketDataError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_empty_result() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(matches!(
            parse_chart(&ticker(), 200, body),
            Err(MarketDataError::EmptyData { .. })
        ));

        let body = r#"{"chart":{"result":[{"meta":{"symbol":"JPM"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let chart = parse_chart(&ticker(), 200, body).unwrap();
        assert!(matches!(
            bars_from_chart(&ticker(), &chart, true),
            Err(MarketDataError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        let service = YahooMarketDataService::builder()
            .base_url("http://localhost:1/".to_string())
            .build();
        assert_eq!(
            service.chart_url(&Ticker::parse("^GSPC").unwrap()),
            "http://localhost:1/v8/finance/chart/%5EGSPC"
        );
    }
}
