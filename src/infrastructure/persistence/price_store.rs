use crate::domain::market::interval::Ticker;
use crate::domain::market::price_series::{PriceBar, PriceSeries};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

/// A CSV written by [`PriceStore::save`]
#[derive(Debug, Clone)]
pub struct SavedCsv {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl SavedCsv {
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// Raw price series as CSV files under the data directory
pub struct PriceStore {
    dir: PathBuf,
}

impl PriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{TICKER}_{YYYYMMDD}.csv`
    pub fn file_name(ticker: &Ticker, date: NaiveDate) -> String {
        format!("{}_{}.csv", ticker, date.format("%Y%m%d"))
    }

    /// Saves under today's (local) date, overwriting a same-day file.
    pub fn save(&self, series: &PriceSeries) -> Result<SavedCsv> {
        self.save_dated(series, Local::now().date_naive())
    }

    pub fn save_dated(&self, series: &PriceSeries, date: NaiveDate) -> Result<SavedCsv> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory {}", self.dir.display()))?;
        let path = self.dir.join(Self::file_name(series.ticker(), date));
        write_csv(series, &path)?;

        let size_bytes = std::fs::metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        info!("PriceStore: saved {} bars to {}", series.len(), path.display());

        Ok(SavedCsv { path, size_bytes })
    }

    /// Loads a series; the ticker defaults to the file name prefix before `_`.
    pub fn load(path: &Path, ticker: Option<Ticker>) -> Result<PriceSeries> {
        let ticker = match ticker {
            Some(t) => t,
            None => ticker_from_path(path)?,
        };

        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let column = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| anyhow!("{}: missing column {}", path.display(), names[0]))
        };

        let date_col = column(&["Date", "Datetime", "timestamp"])?;
        let open_col = column(&["Open"])?;
        let high_col = column(&["High"])?;
        let low_col = column(&["Low"])?;
        let close_col = column(&["Close"])?;
        let volume_col = column(&["Volume"])?;

        let mut bars = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("{}: bad row {}", path.display(), line + 2))?;
            let field = |idx: usize| record.get(idx).unwrap_or("").trim();
            let number = |idx: usize| -> Result<f64> {
                field(idx)
                    .parse::<f64>()
                    .with_context(|| format!("{}: row {} column {}", path.display(), line + 2, idx + 1))
            };

            bars.push(PriceBar {
                timestamp: parse_timestamp(field(date_col))
                    .with_context(|| format!("{}: row {}", path.display(), line + 2))?,
                open: number(open_col)?,
                high: number(high_col)?,
                low: number(low_col)?,
                close: number(close_col)?,
                volume: number(volume_col)?,
            });
        }

        let series = PriceSeries::from_unordered(ticker, bars)
            .with_context(|| format!("{} holds no usable bars", path.display()))?;
        info!("PriceStore: loaded {} bars from {}", series.len(), path.display());
        Ok(series)
    }
}

fn write_csv(series: &PriceSeries, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(HEADER)?;
    for bar in series.bars() {
        writer.write_record([
            bar.timestamp.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn ticker_from_path(path: &Path) -> Result<Ticker> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Cannot infer ticker from {}", path.display()))?;
    let symbol = stem.split('_').next().unwrap_or(stem);
    Ticker::parse(symbol).with_context(|| format!("Cannot infer ticker from {}", path.display()))
}

/// RFC 3339, pandas' `2024-01-02 00:00:00-05:00`, or a bare date (UTC midnight)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(ts) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(ts.and_utc());
    }
    bail!("Unrecognised date {:?}", raw)
}
