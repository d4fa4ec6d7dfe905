//! Prometheus metrics definitions for stockcast
//!
//! All metrics use the `stockcast_` prefix.

use prometheus::{
    CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for one pipeline run
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Bars returned by a provider, per provider and ticker
    pub bars_fetched_total: CounterVec,
    /// Provider fetch latency in seconds
    pub fetch_latency_seconds: HistogramVec,
    /// Feature rows produced
    pub feature_rows: GaugeVec,
    /// Model fit wall time in seconds
    pub fit_duration_seconds: HistogramVec,
    /// Held-out RMSE per ticker/model/space
    pub eval_rmse: GaugeVec,
    /// Held-out MAE per ticker/model/space
    pub eval_mae: GaugeVec,
    /// Failures per pipeline stage
    pub stage_errors_total: CounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bars_fetched_total = CounterVec::new(
            Opts::new("stockcast_bars_fetched_total", "Price bars fetched"),
            &["provider", "ticker"],
        )?;
        registry.register(Box::new(bars_fetched_total.clone()))?;

        let fetch_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_fetch_latency_seconds",
                "Market data fetch latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["provider"],
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        let feature_rows = GaugeVec::new(
            Opts::new("stockcast_feature_rows", "Feature rows built"),
            &["ticker"],
        )?;
        registry.register(Box::new(feature_rows.clone()))?;

        let fit_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_fit_duration_seconds",
                "Model fit duration in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
            &["model"],
        )?;
        registry.register(Box::new(fit_duration_seconds.clone()))?;

        let eval_rmse = GaugeVec::new(
            Opts::new("stockcast_eval_rmse", "Held-out RMSE"),
            &["ticker", "model", "space"],
        )?;
        registry.register(Box::new(eval_rmse.clone()))?;

        let eval_mae = GaugeVec::new(
            Opts::new("stockcast_eval_mae", "Held-out MAE"),
            &["ticker", "model", "space"],
        )?;
        registry.register(Box::new(eval_mae.clone()))?;

        let stage_errors_total = CounterVec::new(
            Opts::new("stockcast_stage_errors_total", "Pipeline stage failures"),
            &["stage"],
        )?;
        registry.register(Box::new(stage_errors_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            bars_fetched_total,
            fetch_latency_seconds,
            feature_rows,
            fit_duration_seconds,
            eval_rmse,
            eval_mae,
            stage_errors_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn observe_fetch(&self, provider: &str, ticker: &str, bars: usize, latency: f64) {
        self.bars_fetched_total
            .with_label_values(&[provider, ticker])
            .inc_by(bars as f64);
        self.fetch_latency_seconds
            .with_label_values(&[provider])
            .observe(latency);
    }

    pub fn observe_fit(&self, model: &str, seconds: f64) {
        self.fit_duration_seconds
            .with_label_values(&[model])
            .observe(seconds);
    }

    pub fn set_eval(&self, ticker: &str, model: &str, space: &str, rmse: f64, mae: f64) {
        self.eval_rmse
            .with_label_values(&[ticker, model, space])
            .set(rmse);
        self.eval_mae
            .with_label_values(&[ticker, model, space])
            .set(mae);
    }

    pub fn inc_stage_error(&self, stage: &str) {
        self.stage_errors_total.with_label_values(&[stage]).inc();
    }
}
