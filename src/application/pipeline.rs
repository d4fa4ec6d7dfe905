//! Forecast pipeline
//!
//! Wires acquisition, storage, feature preparation, training and evaluation
//! together. Every CLI subcommand goes through one `ForecastPipeline`.

use crate::application::market_data::feature_engineering::FeatureBuilder;
use crate::application::market_data::summary::SummaryStats;
use crate::application::ml::artifact::ModelArtifact;
use crate::application::ml::dataset::chronological_split;
use crate::application::ml::evaluator::{Evaluation, Evaluator};
use crate::application::ml::trainer::Trainer;
use crate::config::{Config, DataSource};
use crate::domain::market::interval::{HistoryRequest, Interval, Ticker};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::market::stock_info::StockInfo;
use crate::domain::ml::feature_registry::FeatureSpec;
use crate::domain::ml::feature_row::FeatureMatrix;
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::cached_provider::CachedMarketDataService;
use crate::infrastructure::mock::MockMarketDataService;
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::persistence::{
    Database, ModelStore, PredictionsStore, PriceStore, SavedCsv, SqliteBarRepository,
};
use crate::infrastructure::yahoo::YahooMarketDataService;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a training run
#[derive(Debug)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub matrix: FeatureMatrix,
    /// `None` when the test split is disabled
    pub evaluation: Option<Evaluation>,
    pub model_path: PathBuf,
    pub predictions_path: Option<PathBuf>,
}

/// Result of evaluating a saved model on fresh data
#[derive(Debug)]
pub struct EvaluateOutcome {
    pub evaluation: Evaluation,
    /// Rows strictly after the model's training data
    pub out_of_sample: bool,
    pub predictions_path: PathBuf,
}

pub struct ForecastPipeline {
    config: Config,
    provider: Arc<dyn MarketDataProvider>,
    price_store: PriceStore,
    model_store: ModelStore,
    predictions_store: PredictionsStore,
    metrics: Metrics,
}

impl ForecastPipeline {
    /// Builds the provider stack described by `config` (`offline` forces the mock).
    pub async fn build(config: Config, metrics: Metrics, offline: bool) -> Result<Self> {
        let source = if offline {
            DataSource::Mock
        } else {
            config.data.source
        };

        let base: Arc<dyn MarketDataProvider> = match source {
            DataSource::Yahoo => Arc::new(
                YahooMarketDataService::builder()
                    .base_url(config.data.yahoo_base_url.clone())
                    .timeout_secs(config.data.http_timeout_secs)
                    .max_retries(config.data.http_max_retries)
                    .adjust_prices(config.data.adjust_prices)
                    .build(),
            ),
            DataSource::Mock => Arc::new(MockMarketDataService::new(config.data.mock_seed)),
        };

        let provider: Arc<dyn MarketDataProvider> = if config.data.cache_enabled {
            let db = Database::new(&config.data.cache_database_url)
                .await
                .context("Failed to open bar cache")?;
            info!(
                "Bar cache enabled at {} (TTL {}h)",
                config.data.cache_database_url, config.data.cache_ttl_hours
            );
            Arc::new(CachedMarketDataService::new(
                base,
                Arc::new(SqliteBarRepository::new(db.pool.clone())),
                chrono::Duration::hours(config.data.cache_ttl_hours),
            ))
        } else {
            base
        };

        Ok(Self::with_provider(config, provider, metrics))
    }

    pub fn with_provider(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        metrics: Metrics,
    ) -> Self {
        Self {
            price_store: PriceStore::new(&config.data.data_dir),
            model_store: ModelStore::new(&config.data.models_dir),
            predictions_store: PredictionsStore::new(&config.data.data_dir),
            config,
            provider,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn info(&self, ticker: &Ticker) -> Result<StockInfo> {
        self.provider
            .fetch_info(ticker)
            .await
            .inspect_err(|_| self.metrics.inc_stage_error("info"))
            .with_context(|| format!("Could not fetch stock info for {}", ticker))
    }

    pub async fn fetch(&self, request: &HistoryRequest) -> Result<PriceSeries> {
        info!(
            "Fetching {} {} bars from {} to {} via {}",
            request.ticker,
            request.interval,
            request.range.start,
            request.range.end,
            self.provider.name()
        );

        let started = Instant::now();
        let series = self
            .provider
            .fetch_history(request)
            .await
            .inspect_err(|_| self.metrics.inc_stage_error("fetch"))
            .with_context(|| format!("Error fetching data for {}", request.ticker))?;

        self.metrics.observe_fetch(
            self.provider.name(),
            request.ticker.as_str(),
            series.len(),
            started.elapsed().as_secs_f64(),
        );
        Ok(series)
    }

    pub fn save_series(&self, series: &PriceSeries) -> Result<SavedCsv> {
        self.price_store
            .save(series)
            .inspect_err(|_| self.metrics.inc_stage_error("save"))
    }

    pub fn load_series(&self, path: &Path, ticker: Option<Ticker>) -> Result<PriceSeries> {
        PriceStore::load(path, ticker).inspect_err(|_| self.metrics.inc_stage_error("load"))
    }

    pub fn describe(&self, series: &PriceSeries) -> SummaryStats {
        SummaryStats::of_closes(series)
    }

    pub fn features(&self, series: &PriceSeries, spec: &FeatureSpec) -> Result<FeatureMatrix> {
        let builder = FeatureBuilder::new(spec.clone())?;
        let matrix = builder
            .build(series)
            .inspect_err(|_| self.metrics.inc_stage_error("features"))
            .with_context(|| format!("Feature preparation failed for {}", series.ticker()))?;

        self.metrics
            .feature_rows
            .with_label_values(&[series.ticker().as_str()])
            .set(matrix.len() as f64);
        info!(
            "Prepared {} feature rows x {} features for {}",
            matrix.len(),
            matrix.n_features(),
            series.ticker()
        );
        Ok(matrix)
    }

    /// Features, split, optional CV, fit, held-out evaluation, then persists
    /// the model artifact and the prediction series.
    pub fn train(
        &self,
        series: &PriceSeries,
        interval: Interval,
        overwrite: bool,
    ) -> Result<TrainOutcome> {
        let model_cfg = &self.config.model;
        let matrix = self.features(series, &self.config.features)?;

        let split = chronological_split(&matrix, model_cfg.test_ratio)
            .inspect_err(|_| self.metrics.inc_stage_error("split"))?;
        info!(
            "Chronological split: {} train / {} test rows",
            split.train.len(),
            split.test.len()
        );

        let cv = if model_cfg.cv_folds > 1 {
            Trainer::cross_validate(&model_cfg.kind, &split.train, model_cfg.cv_folds, model_cfg.seed)
                .inspect_err(|_| self.metrics.inc_stage_error("cv"))?
        } else {
            None
        };

        let started = Instant::now();
        let model = Trainer::fit(&model_cfg.kind, &split.train, model_cfg.seed)
            .inspect_err(|_| self.metrics.inc_stage_error("fit"))?;
        self.metrics
            .observe_fit(model_cfg.kind.slug(), started.elapsed().as_secs_f64());

        let evaluation = if split.test.is_empty() {
            warn!("Test split is empty; skipping held-out evaluation");
            None
        } else {
            let evaluation = Evaluator::evaluate(&model, &split.test)
                .inspect_err(|_| self.metrics.inc_stage_error("evaluate"))?;
            self.record_eval(series.ticker(), model_cfg.kind.slug(), &evaluation);
            Some(evaluation)
        };

        let trained_through = split
            .train
            .rows
            .last()
            .map(|r| r.timestamp)
            .context("Training split is empty")?;

        let artifact = ModelArtifact {
            run_id: Uuid::new_v4(),
            ticker: series.ticker().clone(),
            kind: model_cfg.kind,
            interval,
            trained_at: Utc::now(),
            trained_through,
            seed: model_cfg.seed,
            feature_spec: self.config.features.clone(),
            feature_names: matrix.names.clone(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            test_metrics: evaluation.as_ref().map(|e| e.returns),
            cv,
            model,
        };

        let model_path = self
            .model_store
            .save(&artifact, overwrite)
            .inspect_err(|_| self.metrics.inc_stage_error("persist"))?;

        let predictions_path = match &evaluation {
            Some(evaluation) => Some(self.predictions_store.save(
                &artifact.ticker,
                &artifact.kind,
                &evaluation.records,
            )?),
            None => None,
        };

        Ok(TrainOutcome {
            artifact,
            matrix,
            evaluation,
            model_path,
            predictions_path,
        })
    }

    /// Resolves `latest` to the newest artifact for `ticker`, anything else to a path.
    pub fn resolve_model(&self, model: &str, ticker: &Ticker) -> Result<PathBuf> {
        if model.eq_ignore_ascii_case("latest") {
            self.model_store
                .latest(ticker)?
                .with_context(|| format!("No saved model for {}", ticker))
        } else {
            Ok(PathBuf::from(model))
        }
    }

    pub fn load_model(&self, path: &Path) -> Result<ModelArtifact> {
        ModelStore::load(path).inspect_err(|_| self.metrics.inc_stage_error("load_model"))
    }

    /// Scores a saved model on `series`, restricted to bars after its
    /// training data when there are any.
    pub fn evaluate(&self, artifact: &ModelArtifact, series: &PriceSeries) -> Result<EvaluateOutcome> {
        if series.ticker() != &artifact.ticker {
            warn!(
                "Evaluating a {} model on {} data",
                artifact.ticker,
                series.ticker()
            );
        }

        let matrix = self.features(series, &artifact.feature_spec)?;
        let first_new = matrix
            .rows
            .iter()
            .position(|r| r.timestamp > artifact.trained_through);

        let (scored, out_of_sample) = match first_new {
            Some(start) => (matrix.slice(start, matrix.len()), true),
            None => {
                warn!(
                    "No rows after {}; scoring all {} rows (in-sample)",
                    artifact.trained_through,
                    matrix.len()
                );
                (matrix, false)
            }
        };

        let evaluation = Evaluator::evaluate(artifact, &scored)
            .inspect_err(|_| self.metrics.inc_stage_error("evaluate"))?;
        self.record_eval(series.ticker(), artifact.kind.slug(), &evaluation);

        let predictions_path =
            self.predictions_store
                .save(series.ticker(), &artifact.kind, &evaluation.records)?;

        Ok(EvaluateOutcome {
            evaluation,
            out_of_sample,
            predictions_path,
        })
    }

    fn record_eval(&self, ticker: &Ticker, model: &str, evaluation: &Evaluation) {
        self.metrics.set_eval(
            ticker.as_str(),
            model,
            "return",
            evaluation.returns.rmse,
            evaluation.returns.mae,
        );
        self.metrics.set_eval(
            ticker.as_str(),
            model,
            "price",
            evaluation.prices.rmse,
            evaluation.prices.mae,
        );
    }
}
