use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use stockcast::application::pipeline::{ForecastPipeline, TrainOutcome};
use stockcast::application::reporting;
use stockcast::config::Config;
use stockcast::domain::market::interval::{DateRange, HistoryRequest, Interval, Period, Ticker};
use stockcast::domain::market::price_series::PriceSeries;
use stockcast::domain::ml::model_kind::ModelKind;
use stockcast::infrastructure::observability::{Metrics, MetricsReporter, RunSummary};
use tracing::{Level, error, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Stock price forecasting pipeline", long_about = None)]
struct Cli {
    /// TOML file overriding the [features] and [model] settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the deterministic mock provider instead of the network
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show company information for a ticker
    Info { ticker: String },

    /// Fetch historical prices, explain them and save a CSV
    Fetch {
        ticker: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Skip writing the CSV
        #[arg(long)]
        no_save: bool,
    },

    /// Summary statistics of a saved price CSV
    Describe {
        csv: PathBuf,

        /// Ticker label (defaults to the file name prefix)
        #[arg(long)]
        ticker: Option<String>,
    },

    /// Train and evaluate a model, then save it
    Train {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Score a saved model on new data
    Evaluate {
        /// Model JSON file, or `latest` for the newest model of the ticker
        #[arg(long)]
        model: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Fetch, save, describe, train and evaluate in one go
    Run {
        ticker: String,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// Period (1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    period: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Bar interval (1m .. 3mo); defaults to 1d, or to the bar spacing of --input
    #[arg(long)]
    interval: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Price CSV written by `fetch`
    #[arg(long)]
    input: Option<PathBuf>,

    /// Fetch this ticker from the provider
    #[arg(long)]
    ticker: Option<String>,
}

#[derive(Args)]
struct ModelArgs {
    /// linear or random-forest
    #[arg(long = "model")]
    kind: Option<String>,

    /// Share of the newest rows held out for evaluation
    #[arg(long)]
    test_ratio: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Walk-forward CV folds (0 or 1 disables)
    #[arg(long)]
    cv_folds: Option<usize>,

    /// Replace `{TICKER}_{kind}.json` instead of writing a versioned file
    #[arg(long)]
    overwrite: bool,
}

impl RangeArgs {
    fn interval(&self) -> Result<Interval> {
        Interval::from_str(self.interval.as_deref().unwrap_or("1d"))
    }

    /// Explicit `--interval`, else the spacing of a CSV source, else 1d
    fn interval_for(&self, source: &SourceArgs, series: &PriceSeries) -> Result<Interval> {
        if self.interval.is_some() || source.input.is_none() {
            return self.interval();
        }
        match series.infer_interval() {
            Some(interval) => {
                info!("Inferred {} bars from {}", interval, series.ticker());
                Ok(interval)
            }
            None => self.interval(),
        }
    }

    fn request(&self, ticker: Ticker) -> Result<HistoryRequest> {
        let interval = self.interval()?;
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Ok(HistoryRequest {
                ticker,
                range: DateRange::from_dates(start, end)?,
                interval,
            }),
            (None, None) => {
                let period = Period::from_str(self.period.as_deref().unwrap_or("1y"))?;
                Ok(HistoryRequest::for_period(ticker, period, interval))
            }
            _ => bail!("--start and --end must be given together"),
        }
    }
}

impl ModelArgs {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(kind) = &self.kind {
            let kind = ModelKind::from_str(kind)?;
            // Keep configured forest hyperparameters when the family is unchanged
            if kind.slug() != config.model.kind.slug() {
                config.model.kind = kind;
            }
        }
        if let Some(test_ratio) = self.test_ratio {
            config.model.test_ratio = test_ratio;
        }
        if let Some(seed) = self.seed {
            config.model.seed = seed;
        }
        if let Some(cv_folds) = self.cv_folds {
            config.model.cv_folds = cv_folds;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Load .env before reading any configuration
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let metrics = Metrics::new()?;
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = &cli.config {
        config.apply_toml(path)?;
        info!("Applied config overrides from {}", path.display());
    }
    if let Commands::Train { model, .. } | Commands::Run { model, .. } = &cli.command {
        model.apply(&mut config)?;
    }

    let observability = config.observability.clone();
    let reporter = MetricsReporter::new(metrics.clone(), observability.textfile.clone());
    let pipeline = ForecastPipeline::build(config, metrics.clone(), cli.offline).await?;

    let summary = match cli.command {
        Commands::Info { ticker } => {
            let ticker = Ticker::parse(&ticker)?;
            let info = pipeline.info(&ticker).await?;
            reporting::print_info(&info);
            RunSummary {
                command: "info".to_string(),
                ticker: Some(ticker.to_string()),
                ..Default::default()
            }
        }

        Commands::Fetch {
            ticker,
            range,
            no_save,
        } => {
            let request = range.request(Ticker::parse(&ticker)?)?;
            let series = fetch_and_explain(&pipeline, &request, !no_save).await?;
            println!("\n✅ Data fetch complete!");
            RunSummary {
                command: "fetch".to_string(),
                ticker: Some(request.ticker.to_string()),
                bars: Some(series.len()),
                ..Default::default()
            }
        }

        Commands::Describe { csv, ticker } => {
            let ticker = ticker.as_deref().map(Ticker::parse).transpose()?;
            let series = pipeline.load_series(&csv, ticker)?;
            reporting::print_head(&series, 5);
            reporting::print_summary(series.ticker(), &pipeline.describe(&series));
            RunSummary {
                command: "describe".to_string(),
                ticker: Some(series.ticker().to_string()),
                bars: Some(series.len()),
                ..Default::default()
            }
        }

        Commands::Train {
            source,
            range,
            model,
        } => {
            let series = load_source(&pipeline, &source, &range).await?;
            let interval = range.interval_for(&source, &series)?;
            let outcome = pipeline.train(&series, interval, model.overwrite)?;
            report_training(&pipeline, &outcome);
            train_summary("train", &series, &outcome)
        }

        Commands::Evaluate {
            model,
            source,
            range,
        } => {
            let series = load_source(&pipeline, &source, &range).await?;
            let path = pipeline.resolve_model(&model, series.ticker())?;
            let artifact = pipeline.load_model(&path)?;
            let outcome = pipeline.evaluate(&artifact, &series)?;

            if !outcome.out_of_sample {
                warn!("All scored rows were part of the training data");
            }
            reporting::print_evaluation(&artifact.kind.to_string(), &outcome.evaluation);
            println!("Predictions saved to: {}", outcome.predictions_path.display());

            RunSummary {
                command: "evaluate".to_string(),
                ticker: Some(series.ticker().to_string()),
                run_id: Some(artifact.run_id.to_string()),
                bars: Some(series.len()),
                model: Some(artifact.kind.slug().to_string()),
                test_rows: Some(outcome.evaluation.returns.n),
                return_rmse: Some(outcome.evaluation.returns.rmse),
                price_rmse: Some(outcome.evaluation.prices.rmse),
                r2: Some(outcome.evaluation.returns.r2),
                ..Default::default()
            }
        }

        Commands::Run {
            ticker,
            range,
            model,
        } => {
            let request = range.request(Ticker::parse(&ticker)?)?;

            println!("{}", "=".repeat(50));
            println!("Stock Forecast Run");
            println!("{}", "=".repeat(50));
            match pipeline.info(&request.ticker).await {
                Ok(info) => reporting::print_info(&info),
                Err(e) => warn!("{:#}", e),
            }

            let series = fetch_and_explain(&pipeline, &request, true).await?;
            let outcome = pipeline.train(&series, request.interval, model.overwrite)?;
            report_training(&pipeline, &outcome);
            train_summary("run", &series, &outcome)
        }
    };

    if observability.enabled {
        reporter.report(summary)?;
    }
    Ok(())
}

async fn fetch_and_explain(
    pipeline: &ForecastPipeline,
    request: &HistoryRequest,
    save: bool,
) -> Result<PriceSeries> {
    println!("Fetching data for {}...", request.ticker);
    let series = pipeline.fetch(request).await?;
    reporting::print_fetched(&series);
    reporting::print_summary(series.ticker(), &pipeline.describe(&series));

    if save {
        let saved = pipeline.save_series(&series)?;
        println!();
        reporting::print_saved(&saved);
    }
    Ok(series)
}

async fn load_source(
    pipeline: &ForecastPipeline,
    source: &SourceArgs,
    range: &RangeArgs,
) -> Result<PriceSeries> {
    match (&source.input, &source.ticker) {
        (Some(path), _) => pipeline.load_series(path, None),
        (None, Some(ticker)) => {
            let request = range.request(Ticker::parse(ticker)?)?;
            pipeline.fetch(&request).await
        }
        (None, None) => bail!("Either --input or --ticker is required"),
    }
}

fn report_training(pipeline: &ForecastPipeline, outcome: &TrainOutcome) {
    let artifact = &outcome.artifact;
    println!(
        "\nTraining {} on {} rows ({} features)...",
        artifact.kind,
        artifact.train_rows,
        artifact.feature_names.len()
    );
    reporting::print_target_distribution(&outcome.matrix);

    if pipeline.config().model.cv_folds > 1 {
        reporting::print_cv(artifact.cv.as_ref());
    }

    match &outcome.evaluation {
        Some(evaluation) => reporting::print_evaluation(&artifact.kind.to_string(), evaluation),
        None => println!("No test split; evaluation skipped."),
    }

    println!("Model saved to: {}", outcome.model_path.display());
    if let Some(path) = &outcome.predictions_path {
        println!("Predictions saved to: {}", path.display());
    }
}

fn train_summary(command: &str, series: &PriceSeries, outcome: &TrainOutcome) -> RunSummary {
    let artifact = &outcome.artifact;
    let evaluation = outcome.evaluation.as_ref();
    RunSummary {
        command: command.to_string(),
        ticker: Some(series.ticker().to_string()),
        run_id: Some(artifact.run_id.to_string()),
        bars: Some(series.len()),
        feature_rows: Some(outcome.matrix.len()),
        model: Some(artifact.kind.slug().to_string()),
        train_rows: Some(artifact.train_rows),
        test_rows: Some(artifact.test_rows),
        return_rmse: evaluation.map(|e| e.returns.rmse),
        price_rmse: evaluation.map(|e| e.prices.rmse),
        r2: evaluation.map(|e| e.returns.r2),
        cv_mean_rmse: artifact.cv.as_ref().map(|cv| cv.mean_rmse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use stockcast::domain::market::price_series::PriceBar;

    fn hourly_series() -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        let bars = (0..12)
            .map(|h| PriceBar {
                timestamp: start + Duration::hours(h),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 100.0,
            })
            .collect();
        PriceSeries::new(Ticker::parse("JPM").unwrap(), bars).unwrap()
    }

    fn range(interval: Option<&str>) -> RangeArgs {
        RangeArgs {
            period: None,
            start: None,
            end: None,
            interval: interval.map(str::to_string),
        }
    }

    #[test]
    fn test_csv_source_uses_bar_spacing() {
        let source = SourceArgs {
            input: Some(PathBuf::from("data/JPM_20240102.csv")),
            ticker: None,
        };
        let series = hourly_series();

        assert_eq!(
            range(None).interval_for(&source, &series).unwrap(),
            Interval::OneHour
        );
        assert_eq!(
            range(Some("1d")).interval_for(&source, &series).unwrap(),
            Interval::OneDay
        );
    }

    #[test]
    fn test_ticker_source_defaults_to_daily() {
        let source = SourceArgs {
            input: None,
            ticker: Some("JPM".to_string()),
        };
        assert_eq!(
            range(None).interval_for(&source, &hourly_series()).unwrap(),
            Interval::OneDay
        );
    }

    #[test]
    fn test_cli_parses_train_from_csv() {
        let cli = Cli::try_parse_from(["stockcast", "train", "--input", "prices.csv"]).unwrap();
        let Commands::Train { source, range, .. } = cli.command else {
            panic!("expected train");
        };
        assert_eq!(source.input, Some(PathBuf::from("prices.csv")));
        assert!(range.interval.is_none());
    }
}
