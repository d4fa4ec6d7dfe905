use crate::domain::errors::MarketDataError;
use crate::domain::market::interval::{HistoryRequest, Interval, Ticker};
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use crate::domain::market::stock_info::StockInfo;
use crate::domain::ports::MarketDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Most recent bars kept per request
const MAX_BARS: usize = 10_000;
const ANNUAL_DRIFT: f64 = 0.06;
const ANNUAL_VOLATILITY: f64 = 0.25;
const TRADING_DAYS: f64 = 252.0;

/// Offline provider generating a seeded geometric random walk on weekdays.
///
/// The same seed, ticker and request always produce the same series.
pub struct MockMarketDataService {
    seed: u64,
}

impl MockMarketDataService {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, ticker: &Ticker) -> StdRng {
        // FNV-1a over the symbol keeps tickers independent of each other
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in ticker.as_str().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        StdRng::seed_from_u64(self.seed ^ hash)
    }

    /// Bar timestamps `start + i * step` inside the range, newest `MAX_BARS` only.
    fn timestamps(request: &HistoryRequest) -> Vec<DateTime<Utc>> {
        let step = request.interval.to_seconds();
        // Weekly and longer bars are stamped on whatever day the range starts
        let skip_weekends = step <= 86_400;
        let span = (request.range.end - request.range.start).num_seconds();
        let slots = (span + step - 1) / step;

        let mut out = Vec::new();
        let mut i = slots - 1;
        while i >= 0 && out.len() < MAX_BARS {
            let t = request.range.start + Duration::seconds(i * step);
            if !(skip_weekends && matches!(t.weekday(), Weekday::Sat | Weekday::Sun)) {
                out.push(t);
            }
            i -= 1;
        }
        out.reverse();
        out
    }

    fn generate(&self, request: &HistoryRequest) -> Vec<PriceBar> {
        let mut rng = self.rng_for(&request.ticker);
        let timestamps = Self::timestamps(request);

        let dt = step_in_years(request.interval);
        let drift = (ANNUAL_DRIFT - 0.5 * ANNUAL_VOLATILITY.powi(2)) * dt;
        let vol = ANNUAL_VOLATILITY * dt.sqrt();

        let mut close = rng.random_range(20.0..300.0);
        let mut bars = Vec::with_capacity(timestamps.len());

        for timestamp in timestamps {
            let open = close;
            close = open * (drift + vol * standard_normal(&mut rng)).exp();
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..0.01));
            let volume = (rng.random_range(0.5..1.5) * 1_000_000.0_f64).round();

            bars.push(PriceBar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        bars
    }
}

fn step_in_years(interval: Interval) -> f64 {
    // 6.5 trading hours per session
    let session_secs = 6.5 * 3600.0;
    let secs = interval.to_seconds() as f64;
    if interval.is_intraday() {
        secs / session_secs / TRADING_DAYS
    } else {
        (secs / 86_400.0) * (5.0 / 7.0) / TRADING_DAYS
    }
}

/// Box-Muller transform
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[async_trait]
impl MarketDataProvider for MockMarketDataService {
    async fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<PriceSeries, MarketDataError> {
        let bars = self.generate(request);
        debug!(
            "MockMarketData: generated {} bars for {}",
            bars.len(),
            request.ticker
        );

        if bars.is_empty() {
            return Err(MarketDataError::EmptyData {
                ticker: request.ticker.to_string(),
            });
        }

        PriceSeries::new(request.ticker.clone(), bars).map_err(|e| {
            MarketDataError::MalformedResponse {
                reason: e.to_string(),
            }
        })
    }

    async fn fetch_info(&self, ticker: &Ticker) -> Result<StockInfo, MarketDataError> {
        let mut rng = self.rng_for(ticker);
        let last_price: f64 = rng.random_range(20.0..300.0);
        let shares: f64 = rng.random_range(1.0e8..5.0e9);

        Ok(StockInfo {
            symbol: ticker.to_string(),
            long_name: Some(format!("{} Simulated Corp.", ticker)),
            exchange: Some("MOCK".to_string()),
            currency: Some("USD".to_string()),
            instrument_type: Some("EQUITY".to_string()),
            sector: Some("Simulated".to_string()),
            industry: Some("Random Walk".to_string()),
            market_cap: Some((last_price * shares) as u64),
            last_price: Some(last_price),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
