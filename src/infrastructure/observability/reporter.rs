//! Push-based run reporter
//!
//! At the end of a CLI run the summary is printed once as a `METRICS_JSON:`
//! line and, when configured, the Prometheus exposition is written to a
//! textfile for a node exporter to pick up. Nothing listens for requests.

use crate::infrastructure::observability::metrics::Metrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// What a single CLI invocation did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub command: String,
    pub ticker: Option<String>,
    pub run_id: Option<String>,
    pub bars: Option<usize>,
    pub feature_rows: Option<usize>,
    pub model: Option<String>,
    pub train_rows: Option<usize>,
    pub test_rows: Option<usize>,
    pub return_rmse: Option<f64>,
    pub price_rmse: Option<f64>,
    pub r2: Option<f64>,
    pub cv_mean_rmse: Option<f64>,
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub elapsed_seconds: f64,
    pub version: String,
    pub run: RunSummary,
}

/// Created when a run starts; `elapsed_seconds` is measured from here.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
    textfile: Option<PathBuf>,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics, textfile: Option<PathBuf>) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
            textfile,
        }
    }

    pub fn snapshot(&self, run: RunSummary) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            run,
        }
    }

    /// Emits the run summary. Serialization problems are logged, not fatal;
    /// textfile write failures are returned.
    pub fn report(&self, run: RunSummary) -> Result<()> {
        let snapshot = self.snapshot(run);
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                println!("METRICS_JSON:{}", json);
                info!(
                    "Run '{}' finished in {:.2}s",
                    snapshot.run.command, snapshot.elapsed_seconds
                );
            }
            Err(e) => warn!("Failed to serialize metrics: {}", e),
        }

        if let Some(path) = &self.textfile {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, self.metrics.render())
                .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
            info!("Prometheus metrics written to {}", path.display());
        }

        Ok(())
    }
}
