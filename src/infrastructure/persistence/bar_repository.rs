use crate::domain::market::interval::{DateRange, Interval, Ticker};
use crate::domain::market::price_series::PriceBar;
use crate::domain::repositories::BarRepository;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteBarRepository {
    pool: SqlitePool,
}

impl SqliteBarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BarRepository for SqliteBarRepository {
    async fn save_bars(&self, ticker: &Ticker, interval: Interval, bars: &[PriceBar]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        for bar in bars {
            // Re-fetched bars replace cached ones (adjusted prices move after dividends)
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO price_bars
                    (ticker, interval, timestamp, open, high, low, close, volume)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(ticker.as_str())
            .bind(interval.to_yahoo_string())
            .bind(bar.timestamp.timestamp())
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .execute(&mut *tx)
            .await
            .context("Failed to save price bar")?;
        }

        tx.commit().await.context("Failed to commit price bars")?;
        Ok(())
    }

    async fn get_bars(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
    ) -> Result<Vec<PriceBar>> {
        let rows = sqlx::query(
            "SELECT * FROM price_bars WHERE ticker = ? AND interval = ? AND timestamp >= ? AND timestamp < ? ORDER BY timestamp ASC",
        )
        .bind(ticker.as_str())
        .bind(interval.to_yahoo_string())
        .bind(range.start.timestamp())
        .bind(range.end.timestamp())
        .fetch_all(&self.pool)
        .await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let ts: i64 = row.try_get("timestamp")?;
            bars.push(PriceBar {
                timestamp: Utc
                    .timestamp_opt(ts, 0)
                    .single()
                    .ok_or_else(|| anyhow!("Invalid cached timestamp {}", ts))?,
                open: row.try_get("open")?,
                high: row.try_get("high")?,
                low: row.try_get("low")?,
                close: row.try_get("close")?,
                volume: row.try_get("volume")?,
            });
        }
        Ok(bars)
    }

    async fn record_fetch(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fetch_log (ticker, interval, range_start, range_end, fetched_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ticker.as_str())
        .bind(interval.to_yahoo_string())
        .bind(range.start.timestamp())
        .bind(range.end.timestamp())
        .bind(fetched_at.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to record fetch")?;

        Ok(())
    }

    async fn invalidate_overlapping(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        ttl: chrono::Duration,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM fetch_log
            WHERE ticker = ? AND interval = ?
              AND range_start < ?
              AND range_end + ? >= ?
            "#,
        )
        .bind(ticker.as_str())
        .bind(interval.to_yahoo_string())
        .bind(range.end.timestamp())
        .bind(ttl.num_seconds())
        .bind(range.start.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to invalidate fetch log")?;

        Ok(result.rows_affected())
    }

    async fn covers(
        &self,
        ticker: &Ticker,
        interval: Interval,
        range: &DateRange,
        ttl: chrono::Duration,
    ) -> Result<bool> {
        // A fetch covers the request when it started no later than the
        // request and its end, stretched by the TTL, reaches the request end.
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS hits FROM fetch_log
            WHERE ticker = ? AND interval = ?
              AND range_start <= ?
              AND range_end + ? >= ?
            "#,
        )
        .bind(ticker.as_str())
        .bind(interval.to_yahoo_string())
        .bind(range.start.timestamp())
        .bind(ttl.num_seconds())
        .bind(range.end.timestamp())
        .fetch_one(&self.pool)
        .await?;

        let hits: i64 = row.try_get("hits")?;
        Ok(hits > 0)
    }
}
